//! SET handling: a simulated device never accepts writes, but a SET
//! attempt is itself a noteworthy event worth surfacing to the trap
//! manager.
//!
//! Grounded on the teacher's two-phase `test_set`/`commit_set`/`undo_set`
//! machinery (RFC 3416), collapsed to its trivial case: there is no
//! writable MIB object in this simulator, so every SET fails at the test
//! phase with `notWritable` and nothing ever reaches commit.

use crate::error::ErrorStatus;
use crate::pdu::Pdu;
use crate::varbind::VarBind;

/// Build the `notWritable` error response RFC 3416 requires for a rejected
/// SET, pointing `error-index` at the first varbind (1-based; 0 if the
/// request carried none).
pub fn reject(request_id: i32, varbinds: Vec<VarBind>) -> Pdu {
    let error_index = if varbinds.is_empty() { 0 } else { 1 };
    Pdu::error_response(request_id, ErrorStatus::NotWritable.as_i32(), error_index, varbinds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;
    use crate::value::Value;

    #[test]
    fn rejects_with_not_writable_and_first_index() {
        let varbinds = vec![
            VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 5, 0), Value::from("x")),
            VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 6, 0), Value::from("y")),
        ];
        let pdu = reject(9, varbinds);
        assert_eq!(pdu.error_status, ErrorStatus::NotWritable.as_i32());
        assert_eq!(pdu.error_index, 1);
        assert_eq!(pdu.varbinds.len(), 2);
    }

    #[test]
    fn rejects_empty_varbind_list_with_zero_index() {
        let pdu = reject(9, vec![]);
        assert_eq!(pdu.error_index, 0);
    }
}
