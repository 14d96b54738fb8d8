//! Stdin command parsing
//!
//! One command per line:
//!
//! ```text
//! open projects             activate 1        expand 1 dataset:42
//! collapse 1 dataset:42     count 1 [project:7]
//! select 1 image:3 image:4  select 1 +image:5  (leading + adds)
//! search 1 mitosis          next 1 / prev 1   show 1
//! mode group                close 1           wait [ms]
//! quit
//! ```

use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

use canopy_app::{BrowserId, Message, NodeRef};
use canopy_core::{BrowserKind, DisplayMode, Identity, NodeKind};
use regex::Regex;
use thiserror::Error;

static COMMAND_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<verb>[a-z][a-z_-]*)(?:\s+(?P<rest>.*?))?\s*$")
        .expect("Invalid command regex")
});

static NODE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<add>\+)?(?P<kind>[a-z_]+):(?P<id>-?\d+)$").expect("Invalid node regex")
});

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("'{verb}' expects {expected}")]
    Usage {
        verb: &'static str,
        expected: &'static str,
    },

    #[error("invalid browser id '{0}'")]
    BrowserId(String),

    #[error("invalid node reference '{0}', expected kind:id")]
    NodeRef(String),

    #[error("{0}")]
    Value(String),
}

/// Idle period of a bare `wait`
pub const DEFAULT_WAIT: Duration = Duration::from_millis(500);

/// A parsed stdin line
#[derive(Debug, Clone)]
pub enum Command {
    /// Feed a message to the engine
    Send(Message),
    /// Print the visible tree of a browser
    Show(BrowserId),
    /// Process engine messages until none arrives for the given time
    Wait(Duration),
    /// Blank line or comment
    Nothing,
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(Command::Nothing);
        }
        let caps = COMMAND_PATTERN
            .captures(line)
            .ok_or_else(|| CommandError::UnknownCommand(line.to_string()))?;
        let verb = &caps["verb"];
        let rest = caps.name("rest").map(|m| m.as_str()).unwrap_or_default();
        let args: Vec<&str> = rest.split_whitespace().collect();

        let msg = match verb {
            "q" | "quit" => Message::Quit,
            "open" => Message::OpenBrowser {
                kind: single(&args, "open", "a browser kind")?
                    .parse::<BrowserKind>()
                    .map_err(|e| CommandError::Value(e.to_string()))?,
            },
            "mode" => Message::SetDisplayMode {
                mode: single(&args, "mode", "experimenter or group")?
                    .parse::<DisplayMode>()
                    .map_err(|e| CommandError::Value(e.to_string()))?,
            },
            "show" => return Ok(Command::Show(browser(&args, "show")?)),
            "wait" => {
                let idle = match args.as_slice() {
                    [] => DEFAULT_WAIT,
                    [ms] => Duration::from_millis(
                        ms.parse()
                            .map_err(|_| CommandError::Value(format!("invalid wait '{ms}'")))?,
                    ),
                    _ => {
                        return Err(CommandError::Usage {
                            verb: "wait",
                            expected: "[milliseconds]",
                        })
                    }
                };
                return Ok(Command::Wait(idle));
            }
            "focus" => Message::SelectBrowser {
                browser: browser(&args, "focus")?,
            },
            "close" => Message::CloseBrowser {
                browser: browser(&args, "close")?,
            },
            "activate" => Message::Activate {
                browser: browser(&args, "activate")?,
            },
            "refresh" => Message::Refresh {
                browser: browser(&args, "refresh")?,
            },
            "cancel" => Message::Cancel {
                browser: browser(&args, "cancel")?,
            },
            "discard" => Message::Discard {
                browser: browser(&args, "discard")?,
            },
            "siblings" => Message::SelectAllSiblings {
                browser: browser(&args, "siblings")?,
            },
            "clear" => Message::ClearSelection {
                browser: browser(&args, "clear")?,
            },
            "next" => Message::NextFound {
                browser: browser(&args, "next")?,
            },
            "prev" => Message::PreviousFound {
                browser: browser(&args, "prev")?,
            },
            "expand" | "collapse" => {
                let (id, node) = match args.as_slice() {
                    [id, node] => (parse_browser(id)?, parse_node(node)?.1),
                    _ => {
                        return Err(CommandError::Usage {
                            verb: if verb == "expand" { "expand" } else { "collapse" },
                            expected: "<browser> <kind:id>",
                        })
                    }
                };
                if verb == "expand" {
                    Message::Expand { browser: id, node }
                } else {
                    Message::Collapse { browser: id, node }
                }
            }
            "count" => match args.as_slice() {
                [id] => Message::CountItems {
                    browser: parse_browser(id)?,
                    node: None,
                },
                [id, node] => Message::CountItems {
                    browser: parse_browser(id)?,
                    node: Some(parse_node(node)?.1),
                },
                _ => {
                    return Err(CommandError::Usage {
                        verb: "count",
                        expected: "<browser> [kind:id]",
                    })
                }
            },
            "select" => {
                let Some((id, nodes)) = args.split_first() else {
                    return Err(CommandError::Usage {
                        verb: "select",
                        expected: "<browser> [+]kind:id...",
                    });
                };
                let parsed = nodes
                    .iter()
                    .map(|n| parse_node(n))
                    .collect::<Result<Vec<_>, _>>()?;
                Message::Select {
                    browser: parse_browser(id)?,
                    add: parsed.first().is_some_and(|(add, _)| *add),
                    nodes: parsed.into_iter().map(|(_, node)| node).collect(),
                }
            }
            "search" => {
                let (id, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                Message::Search {
                    browser: parse_browser(id)?,
                    text: text.trim().to_string(),
                }
            }
            other => return Err(CommandError::UnknownCommand(other.to_string())),
        };
        Ok(Command::Send(msg))
    }
}

fn single<'a>(
    args: &[&'a str],
    verb: &'static str,
    expected: &'static str,
) -> Result<&'a str, CommandError> {
    match args {
        [one] => Ok(*one),
        _ => Err(CommandError::Usage { verb, expected }),
    }
}

fn browser(args: &[&str], verb: &'static str) -> Result<BrowserId, CommandError> {
    parse_browser(single(args, verb, "<browser>")?)
}

fn parse_browser(s: &str) -> Result<BrowserId, CommandError> {
    s.parse().map_err(|_| CommandError::BrowserId(s.to_string()))
}

/// Parse `[+]kind:id`, returning the add flag and the reference.
fn parse_node(s: &str) -> Result<(bool, NodeRef), CommandError> {
    let caps = NODE_PATTERN
        .captures(s)
        .ok_or_else(|| CommandError::NodeRef(s.to_string()))?;
    let kind: NodeKind = caps["kind"]
        .parse()
        .map_err(|_| CommandError::NodeRef(s.to_string()))?;
    let id: i64 = caps["id"]
        .parse()
        .map_err(|_| CommandError::NodeRef(s.to_string()))?;
    Ok((
        caps.name("add").is_some(),
        NodeRef::Identity(Identity::new(kind, id)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn send(line: &str) -> Message {
        match line.parse::<Command>().unwrap() {
            Command::Send(msg) => msg,
            other => panic!("expected message, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_open_and_mode() {
        assert!(matches!(
            send("open images"),
            Message::OpenBrowser {
                kind: BrowserKind::Images
            }
        ));
        assert!(matches!(
            send("mode group"),
            Message::SetDisplayMode {
                mode: DisplayMode::GroupDisplay
            }
        ));
    }

    #[test]
    fn test_parse_expand_with_identity() {
        match send("expand 2 dataset:42") {
            Message::Expand { browser, node } => {
                assert_eq!(browser, 2);
                assert_eq!(
                    node,
                    NodeRef::Identity(Identity::new(NodeKind::Dataset, 42))
                );
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_select_add_flag() {
        match send("select 1 +image:3 image:4") {
            Message::Select { browser, nodes, add } => {
                assert_eq!(browser, 1);
                assert!(add);
                assert_eq!(nodes.len(), 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_search_keeps_spaces() {
        match send("search 3 late   mitosis") {
            Message::Search { browser, text } => {
                assert_eq!(browser, 3);
                assert_eq!(text, "late   mitosis");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_count_optional_node() {
        assert!(matches!(
            send("count 1"),
            Message::CountItems { node: None, .. }
        ));
        assert!(matches!(
            send("count 1 project:7"),
            Message::CountItems { node: Some(_), .. }
        ));
    }

    #[test]
    fn test_blank_and_comment_lines() {
        assert!(matches!("".parse::<Command>(), Ok(Command::Nothing)));
        assert!(matches!("# note".parse::<Command>(), Ok(Command::Nothing)));
        assert!(matches!("show 4".parse::<Command>(), Ok(Command::Show(4))));
        assert!(matches!("wait".parse::<Command>(), Ok(Command::Wait(d)) if d == DEFAULT_WAIT));
        assert!(
            matches!("wait 20".parse::<Command>(), Ok(Command::Wait(d)) if d == Duration::from_millis(20))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            "fly 1".parse::<Command>().unwrap_err(),
            CommandError::UnknownCommand("fly".into())
        );
        assert_eq!(
            "expand 1 dataset".parse::<Command>().unwrap_err(),
            CommandError::NodeRef("dataset".into())
        );
        assert_eq!(
            "activate x".parse::<Command>().unwrap_err(),
            CommandError::BrowserId("x".into())
        );
        assert!(matches!(
            "open".parse::<Command>().unwrap_err(),
            CommandError::Usage { verb: "open", .. }
        ));
    }
}
