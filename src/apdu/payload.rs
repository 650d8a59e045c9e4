//! Helpers for building command payloads

use crate::common::{Error, Result};

use super::MAX_DATA_LEN;

/// Prefix `field` with its length as a single byte
pub fn prefix_with_len(field: &[u8]) -> Result<Vec<u8>> {
    let len = u8::try_from(field.len()).map_err(|_| Error::FieldTooLong(field.len()))?;
    let mut prefixed = Vec::with_capacity(field.len() + 1);
    prefixed.push(len);
    prefixed.extend_from_slice(field);
    Ok(prefixed)
}

/// Cut `message` into chunks of at most `max_size` bytes, in order
///
/// An empty message gives no chunk. A `max_size` of 0 is read as 1.
pub fn split_message(message: &[u8], max_size: usize) -> Vec<Vec<u8>> {
    message
        .chunks(max_size.max(1))
        .map(<[u8]>::to_vec)
        .collect()
}

/// [`split_message`] into chunks that each fit one command
pub fn split_for_commands(message: &[u8]) -> Vec<Vec<u8>> {
    split_message(message, MAX_DATA_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apdu::Command;

    #[test]
    fn test_prefix_with_len() {
        assert_eq!(prefix_with_len(b"BOL").unwrap(), vec![3, b'B', b'O', b'L']);
        assert_eq!(prefix_with_len(&[]).unwrap(), vec![0]);
        assert_eq!(prefix_with_len(&[0; 255]).unwrap().len(), 256);
        assert!(matches!(
            prefix_with_len(&[0; 256]),
            Err(Error::FieldTooLong(256))
        ));
    }

    #[test]
    fn test_long_message_fits_in_commands() {
        let message: Vec<u8> = (0..600u16).map(|i| i as u8).collect();
        let chunks = split_for_commands(&message);

        assert_eq!(
            chunks.iter().map(Vec::len).collect::<Vec<_>>(),
            vec![255, 255, 90]
        );
        assert_eq!(chunks.concat(), message);
        // every chunk is a valid command payload
        for (i, chunk) in chunks.into_iter().enumerate() {
            let p1 = if i == 0 { 0x00 } else { 0x80 };
            assert!(Command::new(0xe0, 0x04, p1, 0x00, chunk).is_ok());
        }
        assert!(Command::new(0xe0, 0x04, 0x00, 0x00, message).is_err());
    }

    #[test]
    fn test_split_message_edges() {
        assert!(split_message(&[], 4).is_empty());
        assert_eq!(split_message(&[1, 2, 3], 3), vec![vec![1, 2, 3]]);
        assert_eq!(split_message(&[1, 2], 0), vec![vec![1], vec![2]]);
    }
}
