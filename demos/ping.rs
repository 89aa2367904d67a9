//! Ping demo - a handler that answers on the same connection.
//!
//! This demo demonstrates:
//! - Registering a typed topic handler with the builder
//! - Driving the evaluator from a separate "web view" task
//! - Feeding page messages to the connection through the inbound listener
//!
//! The page side would look like:
//!
//! ```js
//! window.webkit.messageHandlers.nativebridge.postMessage(
//!     {topic: "ping", data: {incomingMessage: "Ping!"}});
//!
//! window.addEventListener("nativebridge", (event) => {
//!     if (event.detail.topic === "ping") {
//!         console.log(event.detail.data.outgoingMessage);
//!     }
//! });
//! ```
//!
//! Run with `RUST_LOG=debug cargo run --example ping` to see dispatch logs.

use nativebridge::transport::{spawn_listener, DEFAULT_CHANNEL_CAPACITY};
use nativebridge::{ChannelEvaluator, Connection, Reply, Topic};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

enum DemoTopic {
    Ping,
}

impl Topic for DemoTopic {
    fn name(&self) -> &str {
        match self {
            DemoTopic::Ping => "ping",
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct IncomingData {
    incoming_message: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct OutgoingData {
    outgoing_message: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let (evaluator, mut scripts) = ChannelEvaluator::new();

    let connection = Connection::builder(evaluator)
        .handle(DemoTopic::Ping, |incoming: IncomingData, connection| {
            let outgoing = OutgoingData {
                outgoing_message: format!("Got incoming message: '{}'", incoming.incoming_message),
            };
            connection.send_with(&outgoing, DemoTopic::Ping, |reply| match reply {
                Reply::Success(_) => println!("Success!"),
                Reply::Error(e) => eprintln!("{e}"),
            });
            Ok(())
        })
        .build();

    // Stand-in for the web view: print each script and report success.
    let web_view = tokio::spawn(async move {
        while let Some(request) = scripts.recv().await {
            println!("evaluate: {}", request.script());
            request.complete(Ok(None));
        }
    });

    let (page, inbound) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);
    let listener = spawn_listener(connection.downgrade(), inbound);

    page.send(json!({"topic": "ping", "data": {"incomingMessage": "Ping!"}}))
        .await?;
    page.send(json!({"topic": "ping", "data": {"wrong": true}}))
        .await?;
    page.send(json!({"topic": "unknown", "data": {}})).await?;
    drop(page);
    listener.await?;

    drop(connection);
    web_view.await?;

    Ok(())
}
