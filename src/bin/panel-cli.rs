use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Map, Value};

#[derive(Parser)]
#[command(name = "panel-cli")]
#[command(about = "Management CLI for the inbound panel", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:54321")]
    url: String,

    #[arg(short, long)]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check panel and engine status
    Status,
    /// List your inbounds
    List,
    /// Add one inbound
    Add {
        #[arg(long)]
        port: u16,
        #[arg(long, default_value = "vmess")]
        protocol: String,
        #[arg(long, default_value = "")]
        remark: String,
        /// Protocol settings as a JSON string
        #[arg(long, default_value = "")]
        settings: String,
    },
    /// Add inbounds from a JSON file holding an array of inbounds
    AddBatch { file: PathBuf },
    /// Delete an inbound
    Delete { id: i64 },
    /// Update fields of an inbound
    Update {
        id: i64,
        #[arg(long)]
        port: Option<u16>,
        #[arg(long)]
        remark: Option<String>,
        #[arg(long)]
        enable: Option<bool>,
    },
    /// Restart the proxy engine now
    Restart,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let (path, body) = match cli.command {
        Commands::Status => {
            let res = client
                .get(format!("{}/panel/status", cli.url))
                .headers(headers)
                .send()
                .await?;
            return print_response(res).await;
        }
        Commands::List => ("/panel/inbound/list".to_string(), json!({})),
        Commands::Add { port, protocol, remark, settings } => (
            "/panel/inbound/add".to_string(),
            json!({ "port": port, "protocol": protocol, "remark": remark, "settings": settings }),
        ),
        Commands::AddBatch { file } => {
            let inbounds: Value = serde_json::from_str(&std::fs::read_to_string(file)?)?;
            ("/panel/inbound/addBatch".to_string(), json!({ "inbounds": inbounds }))
        }
        Commands::Delete { id } => (format!("/panel/inbound/del/{}", id), json!({})),
        Commands::Update { id, port, remark, enable } => {
            let mut patch = Map::new();
            if let Some(port) = port {
                patch.insert("port".into(), json!(port));
            }
            if let Some(remark) = remark {
                patch.insert("remark".into(), json!(remark));
            }
            if let Some(enable) = enable {
                patch.insert("enable".into(), json!(enable));
            }
            (format!("/panel/inbound/update/{}", id), Value::Object(patch))
        }
        Commands::Restart => ("/panel/engine/restart".to_string(), json!({})),
    };

    let res = client
        .post(format!("{}{}", cli.url, path))
        .headers(headers)
        .json(&body)
        .send()
        .await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    if json.get("success") == Some(&Value::Bool(false)) {
        eprintln!("{}", json["msg"].as_str().unwrap_or("request failed"));
        return Ok(());
    }
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
