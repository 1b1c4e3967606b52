use crossterm::event::KeyEvent;

use crate::monitor::SessionView;

/// Actions that can be dispatched through the application
#[derive(Debug, Clone)]
pub enum Action {
    /// A key was pressed
    KeyPress(KeyEvent),
    /// A refresh pass finished with ranked sessions
    SessionsUpdated(Vec<SessionView>),
    /// A refresh pass degraded
    Error(String),
    /// Request to quit the application
    Quit,
}
