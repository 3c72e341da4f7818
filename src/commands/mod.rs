pub mod general;
pub mod registration;
pub mod shifts;

pub use general::{help, ping};
pub use registration::{delete_commands, register_commands, Scope};
pub use shifts::{end_shift, login, shift_status, start_shift};

use crate::{Data, Error};

/// Every slash command the bot serves, in registration order
pub fn all_commands() -> Vec<poise::Command<Data, Error>> {
    vec![
        ping(),
        help(),
        login(),
        start_shift(),
        end_shift(),
        shift_status(),
    ]
}
