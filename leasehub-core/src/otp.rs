//! One-time passwords for visitor sign-in

use std::time::Duration;

use bson::DateTime;
use rand::Rng;

/// How long an issued code stays valid
pub const OTP_TTL: Duration = Duration::from_secs(5 * 60);

/// Outcome of comparing a submitted code with the stored one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpCheck {
    Valid,
    /// Wrong code; the stored record stays usable.
    Mismatch,
    Expired,
}

/// Six-digit code in `100000..=999999`.
pub fn generate_otp() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}

pub fn expires_at(issued: DateTime) -> DateTime {
    DateTime::from_millis(issued.timestamp_millis() + OTP_TTL.as_millis() as i64)
}

pub fn is_expired(issued: DateTime, now: DateTime) -> bool {
    now.timestamp_millis() > expires_at(issued).timestamp_millis()
}

/// Expiry wins over a matching code.
pub fn check(stored: &str, supplied: &str, issued: DateTime, now: DateTime) -> OtpCheck {
    if is_expired(issued, now) {
        OtpCheck::Expired
    } else if stored == supplied.trim() {
        OtpCheck::Valid
    } else {
        OtpCheck::Mismatch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime {
        DateTime::from_millis(1_700_000_000_000 + secs * 1000)
    }

    #[test]
    fn six_digits() {
        for _ in 0..100 {
            let otp = generate_otp();
            assert_eq!(otp.len(), 6);
            let n: u32 = otp.parse().unwrap();
            assert!((100_000..=999_999).contains(&n));
        }
    }

    #[test]
    fn mismatch_keeps_code_alive() {
        let issued = at(0);
        assert_eq!(check("482913", "111111", issued, at(30)), OtpCheck::Mismatch);
        assert_eq!(check("482913", "482913", issued, at(60)), OtpCheck::Valid);
    }

    #[test]
    fn expires_after_five_minutes() {
        let issued = at(0);
        assert_eq!(check("482913", " 482913 ", issued, at(300)), OtpCheck::Valid);
        assert_eq!(check("482913", "482913", issued, at(301)), OtpCheck::Expired);
        assert!(is_expired(issued, at(600)));
    }
}
