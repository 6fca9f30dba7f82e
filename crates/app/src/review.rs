//! Line commands for the terminal review prompt.

use khatt_core::RecordId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Edit { id: RecordId, national_id: String, name: String },
    Delete { id: RecordId },
    Create { title: Option<String> },
    Append { sheet_url: String },
    Reset,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  list                              show extracted records
  edit <id> <nationalId> <name...>  replace a record's fields
  delete <id>                       remove a record
  create [title...]                 export to a new spreadsheet
  append <url>                      add rows to an existing spreadsheet
  reset                             discard images and records
  quit";

/// Parse one input line. Record ids may be abbreviated to any unique prefix;
/// resolution happens in the caller.
pub fn parse_command(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Err("empty command".into());
    };
    let rest: Vec<&str> = words.collect();

    match head.to_ascii_lowercase().as_str() {
        "list" | "ls" => Ok(Command::List),
        "edit" => match rest.as_slice() {
            [id, national_id, name @ ..] if !name.is_empty() => Ok(Command::Edit {
                id: RecordId::from(*id),
                national_id: national_id.to_string(),
                name: name.join(" "),
            }),
            _ => Err("usage: edit <id> <nationalId> <name...>".into()),
        },
        "delete" | "rm" => match rest.as_slice() {
            [id] => Ok(Command::Delete { id: RecordId::from(*id) }),
            _ => Err("usage: delete <id>".into()),
        },
        "create" => Ok(Command::Create {
            title: (!rest.is_empty()).then(|| rest.join(" ")),
        }),
        "append" => match rest.as_slice() {
            [url] => Ok(Command::Append { sheet_url: url.to_string() }),
            _ => Err("usage: append <url>".into()),
        },
        "reset" => Ok(Command::Reset),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        other => Err(format!("unknown command '{other}', type 'help'")),
    }
}

/// Find the single record id starting with `prefix`.
pub fn resolve_id<'a>(
    prefix: &RecordId,
    ids: impl IntoIterator<Item = &'a RecordId>,
) -> Result<RecordId, String> {
    let matches: Vec<&RecordId> = ids
        .into_iter()
        .filter(|id| id.as_str().starts_with(prefix.as_str()))
        .collect();
    match matches.as_slice() {
        [one] => Ok((*one).clone()),
        [] => Err(format!("no record with id '{prefix}'")),
        _ => Err(format!("id '{prefix}' is ambiguous")),
    }
}
