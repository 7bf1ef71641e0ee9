pub mod dialogs;
pub mod history;
pub mod prompt_history;
pub mod tools;
