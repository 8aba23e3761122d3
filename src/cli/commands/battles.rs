use serde_json::json;

use crate::cli::client::ApiClient;
use crate::cli::utils::{display_value, output_empty_collection, output_json};
use crate::cli::OutputFormat;
use crate::filter::SearchFilter;

pub async fn count(client: &ApiClient, output_format: OutputFormat) -> anyhow::Result<()> {
    let text = client.count().await?;
    match output_format {
        OutputFormat::Json => {
            let total = text
                .rsplit(' ')
                .next()
                .and_then(|n| n.trim().parse::<i64>().ok());
            output_json(&json!({ "total": total }))
        }
        OutputFormat::Text => {
            println!("{}", text);
            Ok(())
        }
    }
}

pub async fn list(client: &ApiClient, output_format: OutputFormat) -> anyhow::Result<()> {
    let locations = client.list().await?;
    if locations.is_empty() {
        return output_empty_collection(&output_format, "No locations found");
    }
    match output_format {
        OutputFormat::Json => output_json(&locations),
        OutputFormat::Text => {
            for location in locations {
                println!("{}", location);
            }
            Ok(())
        }
    }
}

pub async fn search(client: &ApiClient, search: &SearchFilter, output_format: OutputFormat) -> anyhow::Result<()> {
    let battles = client.search(search).await?;
    if battles.is_empty() {
        return output_empty_collection(&output_format, "No battles matched");
    }
    match output_format {
        OutputFormat::Json => output_json(&battles),
        OutputFormat::Text => {
            for battle in &battles {
                println!(
                    "#{:<3} {:<40} {} vs {} @ {} ({})",
                    battle.battle_number.map(|n| n.to_string()).unwrap_or_default(),
                    battle.name.as_deref().unwrap_or("?"),
                    battle.attacker_king.as_deref().unwrap_or("?"),
                    battle.defender_king.as_deref().unwrap_or("?"),
                    battle.location.as_deref().unwrap_or("?"),
                    battle.battle_type.as_deref().unwrap_or("?"),
                );
            }
            println!("{} battle(s)", battles.len());
            Ok(())
        }
    }
}

pub async fn stats(client: &ApiClient, output_format: OutputFormat) -> anyhow::Result<()> {
    let summary = client.stats().await?;
    match output_format {
        OutputFormat::Json => output_json(&summary),
        OutputFormat::Text => {
            let field = |path: &[&str]| -> String {
                let value = path.iter().fold(&summary, |value, key| &value[*key]);
                display_value(value)
            };

            println!("Most active attacker king: {}", field(&["most_active", "attacker_king"]));
            println!("Most active defender king: {}", field(&["most_active", "defender_king"]));
            println!("Most active region:        {}", field(&["most_active", "region"]));
            println!("Most active name:          {}", field(&["most_active", "name"]));
            println!(
                "Attacker outcomes:         {} win / {} loss",
                field(&["attacker_outcome", "win"]),
                field(&["attacker_outcome", "loss"])
            );
            println!("Battle types:              {}", field(&["battle_type"]));
            println!(
                "Defender size:             min {} / avg {} / max {}",
                field(&["defender_size", "min"]),
                field(&["defender_size", "average"]),
                field(&["defender_size", "max"])
            );
            Ok(())
        }
    }
}
