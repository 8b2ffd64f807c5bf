use console::{style, StyledObject};

use crate::jenkins::BuildState;

pub fn cyan(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).cyan()
}

pub fn dim(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).dim()
}

pub fn bright(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).bright()
}

pub fn bright_red(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).bright().red()
}

/// Build state coloured the way Jenkins shows it: green, red, grey or yellow.
pub fn build_state(state: BuildState) -> StyledObject<String> {
    let text = style(state.to_string()).bold();
    match state {
        BuildState::Success => text.green(),
        BuildState::Failure => text.red(),
        BuildState::Aborted | BuildState::Unknown => text.dim(),
        BuildState::Queued | BuildState::Running => text.yellow(),
    }
}
