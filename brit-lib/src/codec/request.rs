use super::{as_text, decode_date, encode_date, CodecError, WireFormat};
use crate::identity::WalletIdentity;
use crate::messages::{PayerRequest, SessionId, PROTOCOL_VERSION};

const FIELDS: usize = 4;

impl WireFormat for PayerRequest {
    const WHAT: &'static str = "payer request";

    fn encode(&self) -> Vec<u8> {
        format!(
            "{}\n{}\n{}\n{}\n",
            self.version,
            self.identity.to_hex(),
            hex::encode(self.session_id.as_bytes()),
            encode_date(self.first_transaction_date),
        )
        .into_bytes()
    }

    fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let what = Self::WHAT;
        let text = as_text(bytes, what)?;
        let body = text
            .strip_suffix('\n')
            .ok_or_else(|| CodecError::malformed(what, "missing trailing newline"))?;
        let fields: Vec<&str> = body.split('\n').collect();

        let version: u32 = fields
            .first()
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| CodecError::malformed(what, "invalid version"))?;
        if version != PROTOCOL_VERSION {
            return Err(CodecError::UnsupportedVersion(version));
        }
        if fields.len() != FIELDS {
            return Err(CodecError::malformed(
                what,
                format!("expected {} fields, found {}", FIELDS, fields.len()),
            ));
        }

        let identity = WalletIdentity::from_hex(fields[1])
            .ok_or_else(|| CodecError::malformed(what, "invalid wallet identity"))?;
        let session_bytes = hex::decode(fields[2])
            .map_err(|_| CodecError::malformed(what, "session id is not hex"))?;
        let session_id = SessionId::new(session_bytes)
            .map_err(|e| CodecError::malformed(what, e.to_string()))?;
        let first_transaction_date = decode_date(fields[3], what)?;

        Ok(Self {
            version,
            identity,
            session_id,
            first_transaction_date,
        })
    }
}
