// Shell layer - the line-oriented execution environment.
//
// Each input line names its caller and one operation. The shell parses it,
// hands it to the core services and renders the result. Nothing here makes
// authorization decisions.

#[path = "commands.rs"]
pub mod commands;

#[path = "dispatcher.rs"]
pub mod dispatcher;

#[path = "formatter.rs"]
pub mod formatter;

pub use commands::parse_line;
pub use dispatcher::Dispatcher;
