use anyhow::Result;
use rust_audience_api::audiences::{CreateAudienceParams, CustomAudienceService, ListParams};
use rust_audience_api::client::GraphApiClient;
use rust_audience_api::config::Config;
use rust_audience_api::identifiers::IdentifierKind;
use rust_audience_api::lookalikes::{CreateLookalikeParams, LookalikeService};
use rust_audience_api::models::{AdAccount, LookalikeSpec};

// End-to-end walkthrough against a real ad account: create an audience,
// upload a handful of hashed members, derive a lookalike, list the result.
// Needs GRAPH_API_TOKEN and GRAPH_AD_ACCOUNT_ID in the environment.

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    println!("=== Custom Audience Sync ===\n");

    let config = Config::from_env()?;
    let account_id = config
        .ad_account_id
        .clone()
        .ok_or_else(|| anyhow::anyhow!("GRAPH_AD_ACCOUNT_ID must be set"))?;

    let client = GraphApiClient::from_config(&config)?;
    let audiences = CustomAudienceService::new(&client);
    let lookalikes = LookalikeService::new(&client);
    let account = AdAccount::new(&account_id)?;

    // Step 1: create the seed audience
    let mut params = CreateAudienceParams::new("Newsletter Buyers (demo)");
    params.description = Some("Created by the sync_audience demo".to_string());
    params.customer_file_source = Some("USER_PROVIDED_ONLY".to_string());

    let audience_id = audiences.create(&account, &params).await?;
    println!("✓ Audience created: {}", audience_id);

    // Step 2: upload members (hashed client-side before leaving the process)
    let members = vec![
        "joao@example.com".to_string(),
        "maria@example.com".to_string(),
        "test@example.com".to_string(),
    ];

    let summary = audiences
        .add_users(&audience_id, IdentifierKind::Email, &members)
        .await?;
    println!(
        "✓ Uploaded {} entries in {} chunk(s): {} received, {} invalid, {} skipped",
        summary.entries_sent,
        summary.chunks_sent,
        summary.num_received,
        summary.num_invalid_entries,
        summary.entries_skipped
    );

    // Step 3: read it back
    let audience = audiences.get(&audience_id, None).await?;
    println!(
        "✓ Audience '{}' status: {}",
        audience.name.as_deref().unwrap_or("?"),
        audience
            .operation_status
            .as_ref()
            .and_then(|s| s.description.as_deref())
            .unwrap_or("unknown")
    );

    // Step 4: derive a lookalike from it
    let lookalike_params = CreateLookalikeParams {
        name: "Newsletter Buyers Lookalike (demo)".to_string(),
        origin_audience_id: audience_id.clone(),
        spec: LookalikeSpec::new("BR", 0.05),
    };

    match lookalikes.create(&account, &lookalike_params).await {
        Ok(lookalike_id) => println!("✓ Lookalike created: {}", lookalike_id),
        // Lookalike creation fails until the seed audience finishes populating
        Err(e) => println!("✗ Lookalike creation failed: {}", e),
    }

    // Step 5: list what the account has now
    let page = audiences
        .list(
            &account,
            &ListParams {
                limit: Some(10),
                ..ListParams::default()
            },
        )
        .await?;

    println!("\nAudiences under {}:", account.node_id());
    for audience in &page.data {
        println!(
            "  {} - {} ({})",
            audience.id,
            audience.name.as_deref().unwrap_or("?"),
            audience.subtype.as_deref().unwrap_or("?")
        );
    }

    Ok(())
}
