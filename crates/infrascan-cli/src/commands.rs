//! Line commands understood by the simulator.

use anyhow::{Context, bail};
use infrascan_bridge::dispatcher::MethodCall;
use infrascan_bridge::intent::Intent;
use infrascan_bridge::lifecycle::LifecycleEvent;
use std::str::FromStr;

pub const HELP: &str = "\
commands:
  call <method> [json-arguments]   invoke a control-channel method
  listen                           subscribe to scan events
  cancel                           drop the subscription
  scan <code> [type] [aimid]       broadcast a scan from the vendor service
  send <json-intent>               broadcast an arbitrary intent
  attach | detach                  host lifecycle
  config-change | reattach         configuration change round trip
  service on|off                   install or remove the vendor service
  status                           print runtime status
  help                             print this text
  quit                             shut down and exit";

/// One parsed input line.
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    Call(MethodCall),
    Listen,
    Cancel,
    Scan {
        code: String,
        symbology: String,
        aim_id: String,
    },
    Send(Intent),
    Lifecycle(LifecycleEvent),
    Service(bool),
    Status,
    Help,
    Quit,
    Empty,
}

impl FromStr for Line {
    type Err = anyhow::Error;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        let (verb, rest) = input
            .split_once(char::is_whitespace)
            .map(|(verb, rest)| (verb, rest.trim()))
            .unwrap_or((input, ""));

        let line = match verb {
            "" => Self::Empty,
            "call" => {
                let (method, arguments) = rest
                    .split_once(char::is_whitespace)
                    .map(|(method, arguments)| (method, arguments.trim()))
                    .unwrap_or((rest, ""));
                if method.is_empty() {
                    bail!("usage: call <method> [json-arguments]");
                }
                let mut call = MethodCall::new(method);
                if !arguments.is_empty() {
                    call = call.with_arguments(
                        serde_json::from_str(arguments).context("arguments are not valid JSON")?,
                    );
                }
                Self::Call(call)
            }
            "listen" => Self::Listen,
            "cancel" => Self::Cancel,
            "scan" => {
                let mut parts = rest.split_whitespace();
                let Some(code) = parts.next() else {
                    bail!("usage: scan <code> [type] [aimid]");
                };
                Self::Scan {
                    code: code.to_string(),
                    symbology: parts.next().unwrap_or("CODE128").to_string(),
                    aim_id: parts.next().unwrap_or("]C0").to_string(),
                }
            }
            "send" => Self::Send(serde_json::from_str(rest).context("intent is not valid JSON")?),
            "service" => match rest {
                "on" => Self::Service(true),
                "off" => Self::Service(false),
                _ => bail!("usage: service on|off"),
            },
            "status" => Self::Status,
            "help" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => Self::Lifecycle(
                other
                    .parse()
                    .with_context(|| format!("unknown command `{other}`, try `help`"))?,
            ),
        };
        Ok(line)
    }
}
