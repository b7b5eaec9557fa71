use kumo_cloud::{DeviceView, KumoClient, MessageLogMode, SecretString, zone_device_serial};
use serde_json::Value;
use std::env;
use std::time::Duration;

#[tokio::main]
async fn main() -> kumo_cloud::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let username = args
        .get(1)
        .expect("usage: monitor <username> [--log <path>] (password in KUMO_PASSWORD)");
    let password = env::var("KUMO_PASSWORD").expect("KUMO_PASSWORD must be set");
    let log_path = args
        .iter()
        .position(|a| a == "--log")
        .and_then(|i| args.get(i + 1));

    let mut builder = KumoClient::builder();
    if let Some(path) = log_path {
        println!("Logging API traffic to {path}");
        builder = builder.message_log(MessageLogMode::Diffed, path);
    }
    let client = builder.build()?;

    println!("Logging in as {username}...");
    client
        .login(username, &SecretString::from(password))
        .await?;

    let sites = client.get_sites().await?;
    let mut views = Vec::new();
    for site in sites.as_array().into_iter().flatten() {
        let Some(site_id) = site.get("id").and_then(Value::as_str) else {
            continue;
        };
        let zones = client.get_zones(site_id).await?;
        for zone in zones.as_array().into_iter().flatten() {
            let Some(serial) = zone_device_serial(zone) else {
                continue;
            };
            let profile = client.get_device_profile(serial).await?;
            views.push(
                DeviceView::new(serial)
                    .with_zone(zone.clone())
                    .with_profile(&profile),
            );
        }
    }
    println!("Found {} device(s). Polling...", views.len());

    loop {
        for view in &mut views {
            match client.get_device_details(view.serial()).await {
                Ok(device) => view.set_device(device),
                Err(e) => {
                    eprintln!("[{}] refresh failed: {e}", view.serial());
                    continue;
                }
            }
            let identity = view.identity();
            println!(
                "[{}] {} | room: {:?} | target: {:?} | mode: {} ({}) | fan: {:?} | vane: {:?}",
                identity.name,
                identity.serial,
                view.current_temperature(),
                view.target_temperature(),
                view.hvac_mode(),
                view.hvac_action(),
                view.fan_mode(),
                view.swing_mode(),
            );
        }
        tokio::time::sleep(Duration::from_secs(60)).await;
    }
}
