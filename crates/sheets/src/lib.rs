pub mod client;
pub mod exporter;
pub mod token;

pub use client::{NewSpreadsheet, SheetsClient, SheetsError};
pub use exporter::{
    header_format_requests, record_rows, sheet_url, spreadsheet_id_from_url, CreatedSheet,
    GoogleSheetsExporter, SheetExporter, HEADER, TAB_TITLE,
};
pub use token::{
    token_from_connection, token_source_from_settings, AccessToken, CachedToken,
    ConnectorTokenFetcher, StaticTokenFetcher, TokenError, TokenFetcher, TokenSource,
};

use khatt_core::SheetsSettings;
use std::sync::Arc;

/// Build the Google Sheets exporter described by `settings`.
pub fn exporter_from_settings(
    settings: &SheetsSettings,
) -> Result<GoogleSheetsExporter<Arc<dyn TokenSource>>, SheetsError> {
    let tokens = token_source_from_settings(settings)?;
    let client = SheetsClient::new(&settings.api_base, tokens)?;
    Ok(GoogleSheetsExporter::new(client))
}
