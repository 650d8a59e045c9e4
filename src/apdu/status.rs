//! ISO 7816 status words
//!
//! `61XX` and `6CXX` carry a length in their low byte; `63CX` carries the
//! number of remaining attempts. Lookups match those families on their high
//! bits.

pub const SUCCESS: u16 = 0x9000;

pub const RESPONSE_BYTES_AVAILABLE: u16 = 0x6100;
pub const DATA_MAY_BE_CORRUPTED: u16 = 0x6281;
pub const VERIFY_FAILED: u16 = 0x63C0;
pub const EXECUTION_ERROR: u16 = 0x6400;
pub const MEMORY_FAILURE: u16 = 0x6581;
pub const SECURITY_ISSUE: u16 = 0x6600;
pub const WRONG_LENGTH: u16 = 0x6700;
pub const COMMAND_NOT_ALLOWED: u16 = 0x6980;
pub const SECURITY_CONDITION_NOT_SATISFIED: u16 = 0x6982;
pub const CONDITIONS_NOT_SATISFIED: u16 = 0x6985;
pub const INCORRECT_DATA: u16 = 0x6A80;
pub const FUNCTION_NOT_SUPPORTED: u16 = 0x6A81;
pub const FILE_NOT_FOUND: u16 = 0x6A82;
pub const INCORRECT_P1_P2: u16 = 0x6A86;
pub const WRONG_DATA_LENGTH: u16 = 0x6A87;
pub const WRONG_P1_P2: u16 = 0x6B00;
pub const INCORRECT_P3_LENGTH: u16 = 0x6C00;
pub const INVALID_INS: u16 = 0x6D00;
pub const INVALID_CLA: u16 = 0x6E00;
pub const UNKNOWN: u16 = 0x6F00;
pub const BUSY: u16 = 0x9001;

const NAMES: &[(u16, &str)] = &[
    (SUCCESS, "SUCCESS"),
    (DATA_MAY_BE_CORRUPTED, "DATA_MAY_BE_CORRUPTED"),
    (EXECUTION_ERROR, "EXECUTION_ERROR"),
    (MEMORY_FAILURE, "MEMORY_FAILURE"),
    (SECURITY_ISSUE, "SECURITY_ISSUE"),
    (WRONG_LENGTH, "WRONG_LENGTH"),
    (COMMAND_NOT_ALLOWED, "COMMAND_NOT_ALLOWED"),
    (SECURITY_CONDITION_NOT_SATISFIED, "SECURITY_CONDITION_NOT_SATISFIED"),
    (CONDITIONS_NOT_SATISFIED, "CONDITIONS_NOT_SATISFIED"),
    (INCORRECT_DATA, "INCORRECT_DATA"),
    (FUNCTION_NOT_SUPPORTED, "FUNCTION_NOT_SUPPORTED"),
    (FILE_NOT_FOUND, "FILE_NOT_FOUND"),
    (INCORRECT_P1_P2, "INCORRECT_P1_P2"),
    (WRONG_DATA_LENGTH, "WRONG_DATA_LENGTH"),
    (WRONG_P1_P2, "WRONG_P1_P2"),
    (INVALID_INS, "INVALID_INS"),
    (INVALID_CLA, "INVALID_CLA"),
    (UNKNOWN, "UNKNOWN"),
    (BUSY, "BUSY"),
];

/// Human readable name of a status word, `"UNREGISTERED"` when unknown
pub fn status_name(status: u16) -> &'static str {
    match status & 0xFF00 {
        RESPONSE_BYTES_AVAILABLE => return "RESPONSE_BYTES_AVAILABLE",
        INCORRECT_P3_LENGTH => return "INCORRECT_P3_LENGTH",
        _ => {}
    }
    if status & 0xFFF0 == VERIFY_FAILED {
        return "VERIFY_FAILED";
    }
    NAMES
        .iter()
        .find(|(code, _)| *code == status)
        .map(|(_, name)| *name)
        .unwrap_or("UNREGISTERED")
}
