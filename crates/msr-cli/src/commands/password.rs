//! Password generation command.

use clap::Args;

/// Arguments for the password command.
#[derive(Args)]
pub struct PasswordArgs {
    /// Number of characters
    #[arg(short, long, default_value = "16", value_parser = clap::value_parser!(u16).range(8..=128))]
    pub length: u16,
}

/// Runs the password command.
pub fn run(args: &PasswordArgs) -> String {
    msr_client::generate_password(usize::from(args.length))
}
