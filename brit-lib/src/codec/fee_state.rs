use super::{
    as_text, decode_date, encode_date, encode_optional_field, CodecError, WireFormat, NOT_PRESENT,
};
use crate::address::BitcoinAddress;
use crate::fees::SendFeeState;

const SEPARATOR: char = '|';

impl WireFormat for SendFeeState {
    const WHAT: &'static str = "send fee state";

    fn encode(&self) -> Vec<u8> {
        let mut out = String::new();
        out.push_str(&encode_optional_field(self.next_fee_send_count, |c| c.to_string()));
        out.push(SEPARATOR);
        out.push_str(&encode_optional_field(
            self.next_fee_send_address.as_ref(),
            |a| a.to_string(),
        ));
        out.push(SEPARATOR);
        // The third field is only written when set, keeping the two field
        // layout for schedules that never sent a fee.
        if self.last_fee_send_date.is_some() {
            out.push_str(&encode_date(self.last_fee_send_date));
            out.push(SEPARATOR);
        }
        out.into_bytes()
    }

    fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let what = Self::WHAT;
        let text = as_text(bytes, what)?;
        let body = text
            .strip_suffix(SEPARATOR)
            .ok_or_else(|| CodecError::malformed(what, "missing separator"))?;
        let fields: Vec<&str> = body.split(SEPARATOR).collect();
        if !(2..=3).contains(&fields.len()) {
            return Err(CodecError::malformed(
                what,
                format!("expected 2 or 3 fields, found {}", fields.len()),
            ));
        }

        let next_fee_send_count = match fields[0] {
            NOT_PRESENT => None,
            count => Some(count.parse::<u64>().map_err(|_| {
                CodecError::malformed(what, format!("count {:?} out of range", count))
            })?),
        };
        let next_fee_send_address = match fields[1] {
            NOT_PRESENT => None,
            address => Some(
                BitcoinAddress::parse_any(address)
                    .map_err(|e| CodecError::malformed(what, e.to_string()))?,
            ),
        };
        let last_fee_send_date = match fields.get(2) {
            Some(date) => decode_date(date, what)?,
            None => None,
        };

        Ok(Self {
            next_fee_send_count,
            next_fee_send_address,
            last_fee_send_date,
        })
    }
}
