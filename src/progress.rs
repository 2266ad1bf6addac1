use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Spinner on stderr for the remote fetch. Hidden automatically when
/// stderr is not a terminal.
pub fn create_spinner(message: &str, color: bool) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let template = if color {
        "{spinner:.green} {msg}"
    } else {
        "{spinner} {msg}"
    };
    let style = ProgressStyle::default_spinner()
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
        .template(template)
        .unwrap_or_else(|err| {
            tracing::warn!(error = %err, "invalid spinner template");
            ProgressStyle::default_spinner()
        });
    spinner.set_style(style);
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}
