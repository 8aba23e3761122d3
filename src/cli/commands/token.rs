use serde_json::json;

use crate::cli::client::ApiClient;
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;

pub async fn handle(client: &ApiClient, uname: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    let token = client.generate_token(uname).await?;

    match output_format {
        OutputFormat::Json => output_success(
            &output_format,
            "Token generated successfully",
            Some(json!({ "token": token })),
        ),
        OutputFormat::Text => {
            // Bare token so it can be captured with $(battles token ...)
            println!("{}", token);
            Ok(())
        }
    }
}
