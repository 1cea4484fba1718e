use crate::domain::funding::{RedirectParams, RedirectStatus, TxRef};
use url::Url;

/// Extracts `tx_ref`, `status` and `transaction_id` from a gateway return.
///
/// Accepts a full callback URL, a bare query string (`tx_ref=..&status=..`)
/// or one with a leading `?`. Unknown parameters are ignored; blank values
/// count as absent.
pub fn parse_redirect(input: &str) -> Result<RedirectParams, url::ParseError> {
    let input = input.trim();
    let url = match Url::parse(input) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = Url::parse("http://localhost/funding/callback")?;
            let query = input.split_once('?').map_or(input, |(_, q)| q);
            let mut url = base;
            url.set_query(Some(query));
            url
        }
        Err(e) => return Err(e),
    };

    let mut params = RedirectParams::default();
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "tx_ref" => params.reference = TxRef::new(&value),
            "status" if !value.trim().is_empty() => {
                params.status = Some(RedirectStatus::parse(&value))
            }
            "transaction_id" if !value.trim().is_empty() => {
                params.transaction_id = Some(value.trim().to_string())
            }
            _ => {}
        }
    }
    Ok(params)
}
