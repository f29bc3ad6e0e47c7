use crate::completion::SqlHelper;
use crate::config;
use crate::session::Session;
use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{CompletionType, Config, Editor};
use std::path::PathBuf;
use tokio::runtime::Handle;

/// Backslash command typed at the start of a line
#[derive(Debug, Clone, PartialEq, Eq)]
enum SlashCommand {
    Quit,
    Help,
    Clear,
    Status,
    Tables,
    Reload,
    Use(String),
    Ai(String),
    Unknown(String),
}

impl SlashCommand {
    fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        // A lone `\g` terminates the pending statement
        if !line.starts_with('\\') || line == "\\g" {
            return None;
        }
        let (name, arg) = match line.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (line, ""),
        };

        let command = match name {
            "\\q" | "\\quit" | "\\exit" => SlashCommand::Quit,
            "\\h" | "\\help" | "\\?" => SlashCommand::Help,
            "\\c" | "\\clear" => SlashCommand::Clear,
            "\\s" | "\\status" => SlashCommand::Status,
            "\\t" | "\\tables" => SlashCommand::Tables,
            "\\r" | "\\reload" => SlashCommand::Reload,
            "\\u" | "\\use" if !arg.is_empty() => {
                SlashCommand::Use(arg.trim_end_matches(';').trim_matches('`').to_string())
            }
            "\\ai" if !arg.is_empty() => SlashCommand::Ai(arg.to_string()),
            _ => SlashCommand::Unknown(line.to_string()),
        };
        Some(command)
    }
}

/// Collects input lines until a statement terminator is seen
#[derive(Debug, Default)]
struct StatementBuffer {
    pending: Vec<String>,
}

impl StatementBuffer {
    fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn clear(&mut self) {
        self.pending.clear();
    }

    /// Add a line; returns the whole statement once it ends with `;` or `\g`
    fn push(&mut self, line: &str) -> Option<String> {
        let line = line.trim_end();
        if line.trim().is_empty() {
            return None;
        }
        self.pending.push(line.to_string());
        if line.ends_with(';') || line.ends_with("\\g") {
            let statement = self.pending.join("\n");
            self.pending.clear();
            Some(statement)
        } else {
            None
        }
    }
}

pub struct Cli<'a> {
    session: &'a mut Session,
    runtime: Handle,
    editor: Editor<SqlHelper, DefaultHistory>,
    history_path: Option<PathBuf>,
    statement: StatementBuffer,
}

impl<'a> Cli<'a> {
    pub fn new(session: &'a mut Session, runtime: Handle) -> Result<Self> {
        println!("Welcome to sqdesk. Commands end with ; or \\g.");
        match session.database_name() {
            Some(db) => println!("Connected, current database: {}", db),
            None if session.is_connected() => println!("Connected, no database selected"),
            None => println!("Not connected: editing and completion only"),
        }
        println!();
        println!("Type '\\h' for help. Type '\\c' to clear the current input statement.");
        println!();

        let config = Config::builder()
            .completion_type(CompletionType::List)
            .auto_add_history(true)
            .edit_mode(rustyline::EditMode::Emacs)
            .build();
        let mut editor = Editor::with_config(config)?;

        let helper = SqlHelper::new(
            session.engine().clone(),
            session.schema_source().clone(),
            runtime.clone(),
        );
        helper.set_current_database(session.database_name());
        editor.set_helper(Some(helper));

        let history_path = config::history_file();
        if let Some(path) = &history_path {
            if let Err(e) = editor.load_history(path) {
                tracing::debug!("No line history loaded from {}: {}", path.display(), e);
            }
        }

        Ok(Self {
            session,
            runtime,
            editor,
            history_path,
            statement: StatementBuffer::default(),
        })
    }

    pub fn run(&mut self) -> Result<()> {
        loop {
            let prompt = self.prompt();
            match self.editor.readline(&prompt) {
                Ok(line) => {
                    if let Some(command) = SlashCommand::parse(&line) {
                        match self.handle_command(command) {
                            Ok(true) => break,
                            Ok(false) => {}
                            Err(e) => println!("ERROR: {:#}", e),
                        }
                        continue;
                    }
                    if let Some(statement) = self.statement.push(&line) {
                        self.execute(&statement);
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    self.statement.clear();
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    println!("Error: {:?}", err);
                    break;
                }
            }
        }

        println!("Bye");
        self.save_history();
        Ok(())
    }

    fn prompt(&self) -> String {
        if !self.statement.is_empty() {
            return "    -> ".to_string();
        }
        match self.session.database_name() {
            Some(db) => format!("sqdesk [{}]> ", db),
            None => "sqdesk> ".to_string(),
        }
    }

    fn save_history(&mut self) {
        if let Some(path) = &self.history_path {
            if let Some(dir) = path.parent() {
                let _ = std::fs::create_dir_all(dir);
            }
            if let Err(e) = self.editor.save_history(path) {
                tracing::warn!("Failed to save line history to {}: {}", path.display(), e);
            }
        }
    }

    fn execute(&mut self, sql: &str) {
        match self.session.run(sql) {
            Ok(outcome) => println!("{}\n", outcome),
            Err(e) => println!("ERROR: {:#}\n", e),
        }
        self.sync_database();
    }

    fn sync_database(&self) {
        if let Some(helper) = self.editor.helper() {
            helper.set_current_database(self.session.database_name());
        }
    }

    /// Run a backslash command; returns true when the user asked to quit
    fn handle_command(&mut self, command: SlashCommand) -> Result<bool> {
        match command {
            SlashCommand::Quit => return Ok(true),
            SlashCommand::Help => show_help(),
            SlashCommand::Clear => {
                self.statement.clear();
                println!("Query cleared.");
            }
            SlashCommand::Status => {
                println!("--------------");
                println!("{}", self.session.status());
                println!("--------------");
            }
            SlashCommand::Tables => self.execute("SHOW TABLES"),
            SlashCommand::Reload => {
                self.session.reload_schema()?;
                println!("Schema reloaded: {} tables", self.session.tables().len());
            }
            SlashCommand::Use(db) => {
                self.session.use_database(&db)?;
                self.sync_database();
                println!("Database changed");
            }
            SlashCommand::Ai(prompt) => self.ask_ai(&prompt)?,
            SlashCommand::Unknown(line) => {
                println!("Unknown command: {}", line);
                println!("Type '\\h' for help.");
            }
        }
        Ok(false)
    }

    /// Print the SQL the AI provider suggests and put it in line history
    /// so it can be recalled and edited
    fn ask_ai(&mut self, prompt: &str) -> Result<()> {
        let provider = self.session.ai().clone();
        if !provider.is_configured() {
            println!("AI provider not configured. Add an `ai` section to the config file.");
            return Ok(());
        }
        let schema = self.session.schema();
        let sql = self
            .runtime
            .block_on(provider.nl2sql(prompt, Some(&schema)))
            .context("AI request failed")?;

        println!("{}\n", sql);
        self.editor.add_history_entry(sql.as_str())?;
        Ok(())
    }
}

fn show_help() {
    println!("List of sqdesk commands:");
    println!("Statements may span lines and end with ';' or '\\g'.");
    println!();
    println!("\\c (\\clear)     Clear the current input statement.");
    println!("\\h (\\help)      Display this help.");
    println!("\\q (\\quit)      Quit sqdesk.");
    println!("\\r (\\reload)    Reload table and column metadata.");
    println!("\\s (\\status)    Get status information.");
    println!("\\t (\\tables)    List tables in current database.");
    println!("\\u <db> (\\use)  Use database <db>.");
    println!("\\ai <request>   Ask the AI provider to write SQL.");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_slash_commands() {
        assert_eq!(SlashCommand::parse("SELECT 1;"), None);
        assert_eq!(SlashCommand::parse("\\g"), None);
        assert_eq!(SlashCommand::parse("\\q"), Some(SlashCommand::Quit));
        assert_eq!(SlashCommand::parse("  \\status "), Some(SlashCommand::Status));
        assert_eq!(
            SlashCommand::parse("\\u `shop`;"),
            Some(SlashCommand::Use("shop".to_string()))
        );
        assert_eq!(
            SlashCommand::parse("\\ai top 5 customers by spend"),
            Some(SlashCommand::Ai("top 5 customers by spend".to_string()))
        );
        assert_eq!(
            SlashCommand::parse("\\u"),
            Some(SlashCommand::Unknown("\\u".to_string()))
        );
    }

    #[test]
    fn test_statement_spans_lines() {
        let mut buffer = StatementBuffer::default();
        assert_eq!(buffer.push("SELECT *"), None);
        assert_eq!(buffer.push(""), None);
        assert!(!buffer.is_empty());
        assert_eq!(
            buffer.push("FROM users;").as_deref(),
            Some("SELECT *\nFROM users;")
        );
        assert!(buffer.is_empty());

        assert_eq!(buffer.push("SHOW TABLES\\g").as_deref(), Some("SHOW TABLES\\g"));
    }
}
