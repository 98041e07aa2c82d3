use super::{as_text, decode_date, encode_date, CodecError, WireFormat};
use crate::address::BitcoinAddress;
use crate::messages::MatcherResponse;

impl WireFormat for MatcherResponse {
    const WHAT: &'static str = "matcher response";

    fn encode(&self) -> Vec<u8> {
        let mut out = encode_date(self.replay_date);
        out.push('\n');
        for address in &self.addresses {
            out.push_str(address.as_str());
            out.push('\n');
        }
        out.into_bytes()
    }

    fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let what = Self::WHAT;
        let text = as_text(bytes, what)?;
        let body = text
            .strip_suffix('\n')
            .ok_or_else(|| CodecError::malformed(what, "truncated record"))?;

        let mut lines = body.split('\n');
        // split always yields at least one item
        let replay_date = decode_date(lines.next().unwrap_or_default(), what)?;

        let addresses = lines
            .enumerate()
            .map(|(i, line)| {
                BitcoinAddress::parse_any(line)
                    .map_err(|e| CodecError::malformed(what, format!("address {}: {}", i + 1, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            addresses,
            replay_date,
        })
    }
}
