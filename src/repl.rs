use rustyline::{error::ReadlineError, DefaultEditor};

use crate::{
    diagnostics::{Result, TesseraError},
    runtime::{EngineOptions, Interpreter},
    value::Value,
};

/// Line-oriented session over one persistent interpreter, so bindings made by
/// earlier lines stay visible to later ones.
pub struct Repl {
    interpreter: Interpreter,
}

impl Repl {
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default())
    }

    pub fn with_options(options: EngineOptions) -> Self {
        Self {
            interpreter: Interpreter::with_options(options),
        }
    }

    pub fn interpreter_mut(&mut self) -> &mut Interpreter {
        &mut self.interpreter
    }

    /// Evaluates one line and renders what the session prints for it.
    pub fn eval_line(&mut self, line: &str) -> std::result::Result<String, String> {
        match self.interpreter.eval_source(line) {
            Ok(Value::Undefined) => Ok("undefined".to_string()),
            Ok(value) => Ok(format!("{value:?}")),
            Err(TesseraError::Diagnostic(diag)) => {
                let location = diag
                    .location(line)
                    .map(|(line, column)| format!(" at {line}:{column}"))
                    .unwrap_or_default();
                Err(format!("SyntaxError: {}{location}", diag.message))
            }
            Err(other) => Err(other.to_string()),
        }
    }

    pub fn run(&mut self) -> Result<()> {
        let mut editor = DefaultEditor::new().map_err(|err| TesseraError::from(std::io::Error::other(err)))?;
        loop {
            match editor.readline("> ") {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed == ":quit" || trimmed == ":exit" {
                        break;
                    }
                    if trimmed.is_empty() {
                        continue;
                    }
                    editor.add_history_entry(trimmed).ok();
                    match self.eval_line(trimmed) {
                        Ok(rendered) => println!("{rendered}"),
                        Err(message) => eprintln!("{message}"),
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(err) => return Err(TesseraError::from(std::io::Error::other(err))),
            }
        }
        Ok(())
    }
}

impl Default for Repl {
    fn default() -> Self {
        Self::new()
    }
}
