use tunnel_manager::TunnelManager;

/// Printed directly: the listing is the command's data, so `--quiet` does
/// not suppress it.
pub async fn run_list(manager: &TunnelManager, json: bool) -> anyhow::Result<()> {
    if json {
        let entries = manager.list_entries().await;
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        println!("{}", manager.list().await?);
    }
    Ok(())
}
