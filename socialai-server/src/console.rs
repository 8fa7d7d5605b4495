//! Line-oriented console. Plain text is sent to the assistant chat; lines
//! starting with `/` are commands.

use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;
use socialai_common::models::{FeatureId, InboundEvent, Platform};
use socialai_core::Orchestrator;

const HELP: &str = "\
commands:
  /connect <whatsapp|instagram>
  /disconnect <whatsapp|instagram>
  /enable <feature>      /disable <feature>
  /group <platform> <group> <sender> <text...>
  /post <platform>
  /status                /log
  /save                  /load
  /quit";

#[derive(Debug, PartialEq)]
enum Command {
    Chat(String),
    Connect(Platform),
    Disconnect(Platform),
    Toggle(String, bool),
    Group { platform: Platform, group: String, sender: String, text: String },
    Post(Platform),
    Status,
    Log,
    Save,
    Load,
    Help,
    Quit,
}

fn parse(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Command::Chat(line.to_string()));
    };
    let mut parts = rest.split_whitespace();
    let verb = parts.next().unwrap_or_default();
    let platform = |arg: Option<&str>| -> Result<Platform, String> {
        arg.ok_or_else(|| format!("/{} needs a platform", verb))?.parse()
    };

    match verb {
        "connect" => Ok(Command::Connect(platform(parts.next())?)),
        "disconnect" => Ok(Command::Disconnect(platform(parts.next())?)),
        "enable" | "disable" => {
            let id = parts.next().ok_or_else(|| format!("/{} needs a feature id", verb))?;
            Ok(Command::Toggle(id.to_string(), verb == "enable"))
        }
        "group" => {
            let platform = platform(parts.next())?;
            let (Some(group), Some(sender)) = (parts.next(), parts.next()) else {
                return Err("usage: /group <platform> <group> <sender> <text...>".into());
            };
            let text = parts.collect::<Vec<_>>().join(" ");
            Ok(Command::Group { platform, group: group.into(), sender: sender.into(), text })
        }
        "post" => Ok(Command::Post(platform(parts.next())?)),
        "status" => Ok(Command::Status),
        "log" => Ok(Command::Log),
        "save" => Ok(Command::Save),
        "load" => Ok(Command::Load),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(format!("unknown command '/{}'", other)),
    }
}

fn print_status(orch: &Orchestrator) {
    for account in orch.accounts() {
        let active: Vec<String> = orch
            .active_features(account.platform)
            .into_iter()
            .map(|f| f.to_string())
            .collect();
        println!("{:<10} {:<13} active: [{}]", account.platform, account.state, active.join(", "));
    }
    for feature in FeatureId::ALL {
        let flag = if orch.features().get(feature) { "on" } else { "off" };
        println!("  {:<20} {}", feature.as_str(), flag);
    }
}

pub async fn run(orch: Arc<Orchestrator>) -> anyhow::Result<()> {
    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match parse(&line) {
            Ok(c) => c,
            Err(msg) => {
                println!("! {}", msg);
                continue;
            }
        };
        debug!("console command: {:?}", command);

        match command {
            Command::Chat(text) => {
                // the reply is printed by the activity subscriber
                orch.send_user_message(&text).await?;
            }
            Command::Connect(p) => {
                if let Err(e) = orch.connect(p).await {
                    println!("! {}", e);
                }
            }
            Command::Disconnect(p) => orch.disconnect(p).await,
            Command::Toggle(id, on) => orch.set_feature(&id, on),
            Command::Group { platform, group, sender, text } => {
                orch.dispatch(InboundEvent::group(platform, group, sender, text)).await?;
            }
            Command::Post(platform) => {
                orch.dispatch(InboundEvent::PostCreated { platform, post_id: None }).await?;
            }
            Command::Status => print_status(&orch),
            Command::Log => {
                for entry in orch.activity() {
                    println!("{}", crate::render_entry(&entry));
                }
            }
            Command::Save => {
                let _ = orch.save_settings().await;
            }
            Command::Load => {
                let _ = orch.load_settings().await;
            }
            Command::Help => println!("{}", HELP),
            Command::Quit => break,
        }
    }
    Ok(())
}
