//! Access checks and transfers on caller memory.

use qctl_core::constants::INT_PAYLOAD_LEN;
use qctl_core::protocol::{Direction, UserRegion};

use crate::error::GatewayError;

/// Is `region` usable for a command moving `size` bytes in direction `dir`?
///
/// Commands without a direction never touch caller memory and always pass.
pub fn access_ok(region: Option<&UserRegion>, dir: Direction, size: usize) -> bool {
    if dir == Direction::NONE {
        return true;
    }
    let Some(region) = region else {
        return false;
    };
    if region.len() < size {
        return false;
    }
    (!dir.writes_caller() || region.access.writable())
        && (!dir.reads_caller() || region.access.readable())
}

/// Operations the gateway performs on caller memory.
pub trait CallerMemory {
    /// Read the integer at the start of the region.
    fn get_int(&self) -> Result<i32, GatewayError>;

    /// Write an integer at the start of the region.
    fn put_int(&mut self, value: i32) -> Result<(), GatewayError>;

    /// Copy `bytes` to the start of the region.
    fn copy_out(&mut self, bytes: &[u8]) -> Result<(), GatewayError>;
}

impl CallerMemory for UserRegion {
    fn get_int(&self) -> Result<i32, GatewayError> {
        if !self.access.readable() {
            return Err(GatewayError::BadAddress);
        }
        let bytes: [u8; INT_PAYLOAD_LEN] = self
            .data
            .get(..INT_PAYLOAD_LEN)
            .and_then(|b| b.try_into().ok())
            .ok_or(GatewayError::BadAddress)?;
        Ok(i32::from_le_bytes(bytes))
    }

    fn put_int(&mut self, value: i32) -> Result<(), GatewayError> {
        self.copy_out(&value.to_le_bytes())
    }

    fn copy_out(&mut self, bytes: &[u8]) -> Result<(), GatewayError> {
        if !self.access.writable() {
            return Err(GatewayError::BadAddress);
        }
        let dst = self
            .data
            .get_mut(..bytes.len())
            .ok_or(GatewayError::BadAddress)?;
        dst.copy_from_slice(bytes);
        Ok(())
    }
}

/// Borrow the region a pointer verb needs, or fail with `BadAddress`.
pub fn require(region: Option<&mut UserRegion>) -> Result<&mut UserRegion, GatewayError> {
    region.ok_or(GatewayError::BadAddress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use qctl_core::protocol::Access;

    #[test]
    fn no_direction_needs_no_region() {
        assert!(access_ok(None, Direction::NONE, 0));
    }

    #[test]
    fn missing_region_fails() {
        assert!(!access_ok(None, Direction::READ, 4));
        assert!(!access_ok(None, Direction::WRITE, 4));
    }

    #[test]
    fn short_region_fails() {
        let region = UserRegion::new(vec![0; 3], Access::ReadWrite);
        assert!(!access_ok(Some(&region), Direction::READ_WRITE, 4));
    }

    #[test]
    fn protection_must_match_direction() {
        let ro = UserRegion::int(1, Access::ReadOnly);
        let wo = UserRegion::out(4);
        // store -> caller needs writable memory
        assert!(!access_ok(Some(&ro), Direction::READ, 4));
        assert!(access_ok(Some(&wo), Direction::READ, 4));
        // caller -> store needs readable memory
        assert!(access_ok(Some(&ro), Direction::WRITE, 4));
        assert!(!access_ok(Some(&wo), Direction::WRITE, 4));
        // both ways needs both
        assert!(!access_ok(Some(&ro), Direction::READ_WRITE, 4));
        let rw = UserRegion::int(1, Access::ReadWrite);
        assert!(access_ok(Some(&rw), Direction::READ_WRITE, 4));
    }

    #[test]
    fn get_and_put_int() {
        let mut region = UserRegion::int(7, Access::ReadWrite);
        assert_eq!(region.get_int(), Ok(7));
        region.put_int(-3).unwrap();
        assert_eq!(region.get_int(), Ok(-3));
    }

    #[test]
    fn put_into_read_only_fails() {
        let mut region = UserRegion::int(7, Access::ReadOnly);
        assert_eq!(region.put_int(1), Err(GatewayError::BadAddress));
        assert_eq!(region.peek_int(), Some(7));
    }

    #[test]
    fn copy_out_past_end_fails() {
        let mut region = UserRegion::out(2);
        assert_eq!(region.copy_out(&[1, 2, 3]), Err(GatewayError::BadAddress));
    }
}
