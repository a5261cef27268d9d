use chrono::Utc;
use serde_json::Value;
use shelfwatch_core::{parse_payload, AttributeNormalizer, ProviderId, ScrapeRequest};

use crate::cli::NormalizeArgs;
use crate::error::CliError;

pub async fn execute(args: &NormalizeArgs) -> Result<Value, CliError> {
    let provider = ProviderId::from(args.provider);
    let request = ScrapeRequest::from_url(&args.url)?;
    let body = tokio::fs::read_to_string(&args.path).await?;

    tracing::debug!(
        provider = provider.as_str(),
        listing = %request.listing,
        bytes = body.len(),
        "normalizing saved payload"
    );
    let raw = parse_payload(provider, &body)?;
    let record = AttributeNormalizer::new().normalize(
        request.listing,
        &request.url,
        &request.market,
        &raw,
        Utc::now(),
    );

    Ok(serde_json::to_value(record)?)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::cli::ProviderArg;

    #[tokio::test]
    async fn normalizes_a_saved_scrapingdog_payload() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{"title":"Wool Socks","price":"23,45 €","average_rating":"4,6 out of 5 stars","total_reviews":"1.234 ratings"}}"#
        )
        .expect("write payload");

        let args = NormalizeArgs {
            path: file.path().to_path_buf(),
            provider: ProviderArg::Scrapingdog,
            url: String::from("https://www.amazon.de/dp/B0CXYZ1234"),
        };
        let value = execute(&args).await.expect("normalized");

        assert_eq!(value["listing_id"], "B0CXYZ1234");
        assert_eq!(value["title"], "Wool Socks");
    }

    #[tokio::test]
    async fn rejects_urls_without_listing_code() {
        let args = NormalizeArgs {
            path: std::path::PathBuf::from("unused.json"),
            provider: ProviderArg::Oxylabs,
            url: String::from("https://www.amazon.de/gp/bestsellers"),
        };
        let error = execute(&args).await.expect_err("no listing code");
        assert_eq!(error.exit_code(), 3);
    }
}
