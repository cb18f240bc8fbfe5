//! Sends one test push through the Expo client (stdout/log only).
//!
//! Usage: `push_probe <ExponentPushToken[...]> [title] [body]`
//! or set `PROBE_PUSH_TOKEN`.

use gunbound_rank_relay::notify::{ExpoPushClient, PushSender};
use gunbound_rank_relay::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let mut args = std::env::args().skip(1);
    let token = args
        .next()
        .or_else(|| std::env::var("PROBE_PUSH_TOKEN").ok())
        .ok_or_else(|| anyhow::anyhow!("pass a push token or set PROBE_PUSH_TOKEN"))?;
    let title = args.next().unwrap_or_else(|| "Test notification".to_string());
    let body = args
        .next()
        .unwrap_or_else(|| "This is a test notification from the relay".to_string());

    let cfg = AppConfig::load()?;
    let client = ExpoPushClient::from_config(&cfg);

    match client.send(&token, &title, &body).await {
        Ok(answer) => {
            tracing::info!("provider answered: {answer}");
            println!("push-probe ok");
            Ok(())
        }
        Err(e) => {
            tracing::error!(kind = e.kind(), "push failed: {e}");
            Err(e.into())
        }
    }
}
