//! Control gateway: validates a command and dispatches it to the store or
//! the ledger.
//!
//! Per request:
//! 1. The code must be in the verb family (magic and number range), else
//!    `UnsupportedCommand`, before any memory is looked at.
//! 2. Caller memory implied by the code's direction must be present, large
//!    enough and accessible, else `BadAddress`.
//! 3. The exact code selects the verb; anything else is
//!    `UnsupportedCommand`.
//!
//! Nothing about a caller survives between requests apart from what the
//! store and the ledger hold.

use tracing::{debug, trace};

use qctl_core::protocol::{CommandCode, Request, Response, UserRegion, Verb};

use crate::context::CallerContext;
use crate::error::GatewayError;
use crate::ledger::Ledger;
use crate::memory::{access_ok, require, CallerMemory};
use crate::store::ParameterStore;

#[derive(Debug)]
pub struct Gateway {
    store: ParameterStore,
    ledger: Ledger,
}

impl Gateway {
    pub fn new(store: ParameterStore, ledger: Ledger) -> Self {
        Self { store, ledger }
    }

    pub fn store(&self) -> &ParameterStore {
        &self.store
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Give up the gateway, keeping only the ledger for teardown.
    pub fn into_ledger(self) -> Ledger {
        self.ledger
    }

    /// Run one command for `ctx`.
    ///
    /// On success returns the result code; `region` holds whatever the verb
    /// wrote into caller memory.
    pub fn dispatch(
        &self,
        ctx: &CallerContext,
        code: CommandCode,
        arg: i64,
        region: &mut Option<UserRegion>,
    ) -> Result<i64, GatewayError> {
        if !code.in_family() {
            return Err(GatewayError::UnsupportedCommand { code });
        }

        if !access_ok(region.as_ref(), code.direction(), code.size()) {
            return Err(GatewayError::BadAddress);
        }

        let verb = Verb::from_code(code).ok_or(GatewayError::UnsupportedCommand { code })?;
        trace!(%verb, caller_id = ctx.caller_id, group_id = ctx.group_id, "Dispatching");

        match verb {
            Verb::Reset => {
                self.store.reset();
                Ok(0)
            }
            Verb::SetFromPointer => {
                self.store.set_from(require(region.as_mut())?)?;
                Ok(0)
            }
            Verb::TellValue => {
                // The argument is a machine word; the quantum keeps its low half.
                self.store.tell(arg as i32);
                Ok(0)
            }
            Verb::GetToPointer => {
                self.store.get_into(require(region.as_mut())?)?;
                Ok(0)
            }
            Verb::QueryValue => Ok(self.store.query() as i64),
            Verb::ExchangeFromPointer => {
                self.store.exchange(require(region.as_mut())?)?;
                Ok(0)
            }
            Verb::ShiftValue => Ok(self.store.shift(arg as i32) as i64),
            Verb::Register => {
                let snapshot = self.ledger.register(ctx)?;
                require(region.as_mut())?.copy_out(&snapshot.to_bytes())?;
                Ok(0)
            }
        }
    }

    /// Answer a wire request, folding errors into a negative result code.
    pub fn handle(&self, ctx: &CallerContext, request: Request) -> Response {
        let code = CommandCode(request.command);
        let mut region = request.region;

        let result = match self.dispatch(ctx, code, request.arg, &mut region) {
            Ok(result) => result,
            Err(e) => {
                debug!(
                    command = %code,
                    caller_id = ctx.caller_id,
                    error = %e,
                    "Command rejected"
                );
                e.result_code()
            }
        };

        Response {
            request_id: request.request_id,
            result,
            region,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qctl_core::constants::{COMMAND_MAGIC, DEFAULT_QUANTUM, SNAPSHOT_LEN};
    use qctl_core::protocol::{Access, Direction};
    use qctl_core::SnapshotRecord;

    fn gateway() -> Gateway {
        Gateway::new(ParameterStore::default(), Ledger::new())
    }

    fn ctx() -> CallerContext {
        CallerContext::new(1001, 1000)
    }

    fn run(gw: &Gateway, verb: Verb, arg: i64, region: Option<UserRegion>) -> Response {
        gw.handle(
            &ctx(),
            Request {
                request_id: 1,
                command: verb.code().0,
                arg,
                region,
                thread_id: None,
            },
        )
    }

    #[test]
    fn reset_then_query() {
        let gw = gateway();
        run(&gw, Verb::TellValue, 55, None);
        assert_eq!(run(&gw, Verb::Reset, 0, None).result, 0);
        assert_eq!(run(&gw, Verb::QueryValue, 0, None).result, DEFAULT_QUANTUM as i64);
    }

    #[test]
    fn tell_then_query() {
        let gw = gateway();
        assert_eq!(run(&gw, Verb::TellValue, 7, None).result, 0);
        assert_eq!(run(&gw, Verb::QueryValue, 0, None).result, 7);
    }

    #[test]
    fn set_and_get_through_pointers() {
        let gw = gateway();
        let set = run(
            &gw,
            Verb::SetFromPointer,
            0,
            Some(UserRegion::int(9, Access::ReadOnly)),
        );
        assert_eq!(set.result, 0);

        let got = run(&gw, Verb::GetToPointer, 0, Some(UserRegion::out(4)));
        assert_eq!(got.result, 0);
        assert_eq!(got.region.unwrap().peek_int(), Some(9));
    }

    #[test]
    fn exchange_then_query() {
        let gw = gateway();
        run(&gw, Verb::TellValue, 7, None);
        let resp = run(
            &gw,
            Verb::ExchangeFromPointer,
            0,
            Some(UserRegion::int(5, Access::ReadWrite)),
        );
        assert_eq!(resp.result, 0);
        assert_eq!(resp.region.unwrap().peek_int(), Some(7));
        assert_eq!(run(&gw, Verb::QueryValue, 0, None).result, 5);
    }

    #[test]
    fn shift_returns_previous_as_result() {
        let gw = gateway();
        run(&gw, Verb::TellValue, 5, None);
        assert_eq!(run(&gw, Verb::ShiftValue, 3, None).result, 5);
        assert_eq!(run(&gw, Verb::QueryValue, 0, None).result, 3);
    }

    #[test]
    fn negative_quantum_is_indistinguishable_from_error() {
        let gw = gateway();
        run(&gw, Verb::TellValue, -14, None);
        // Same code a bad address would produce
        assert_eq!(
            run(&gw, Verb::QueryValue, 0, None).result,
            GatewayError::BadAddress.result_code()
        );
    }

    #[test]
    fn unknown_magic_is_unsupported_before_memory_checks() {
        let gw = gateway();
        let code = CommandCode::new(Direction::READ, b'z', 3, 4);
        let mut region = None;
        assert_eq!(
            gw.dispatch(&ctx(), code, 0, &mut region),
            Err(GatewayError::UnsupportedCommand { code })
        );
    }

    #[test]
    fn number_out_of_range_is_unsupported() {
        let gw = gateway();
        let code = CommandCode::new(Direction::NONE, COMMAND_MAGIC, 8, 0);
        let resp = gw.handle(
            &ctx(),
            Request {
                request_id: 4,
                command: code.0,
                arg: 0,
                region: None,
                thread_id: None,
            },
        );
        assert_eq!(resp.result, -25);
        assert_eq!(resp.request_id, 4);
    }

    #[test]
    fn in_range_code_with_wrong_shape_is_unsupported() {
        let gw = gateway();
        // nr of Reset, but with a write direction and a size
        let code = CommandCode::new(Direction::WRITE, COMMAND_MAGIC, 0, 4);
        let mut region = Some(UserRegion::int(1, Access::ReadOnly));
        assert_eq!(
            gw.dispatch(&ctx(), code, 0, &mut region),
            Err(GatewayError::UnsupportedCommand { code })
        );
        assert_eq!(gw.store().query(), DEFAULT_QUANTUM);
    }

    #[test]
    fn pointer_verbs_without_memory_fail_bad_address() {
        let gw = gateway();
        for verb in [
            Verb::SetFromPointer,
            Verb::GetToPointer,
            Verb::ExchangeFromPointer,
            Verb::Register,
        ] {
            assert_eq!(run(&gw, verb, 0, None).result, -14, "{verb}");
        }
        assert_eq!(gw.store().query(), DEFAULT_QUANTUM);
        assert!(gw.ledger().is_empty());
    }

    #[test]
    fn get_into_read_only_memory_fails() {
        let gw = gateway();
        let resp = run(
            &gw,
            Verb::GetToPointer,
            0,
            Some(UserRegion::int(0, Access::ReadOnly)),
        );
        assert_eq!(resp.result, -14);
        assert_eq!(resp.region.unwrap().peek_int(), Some(0));
    }

    #[test]
    fn exchange_needs_both_directions() {
        let gw = gateway();
        let resp = run(
            &gw,
            Verb::ExchangeFromPointer,
            0,
            Some(UserRegion::int(5, Access::ReadOnly)),
        );
        assert_eq!(resp.result, -14);
        assert_eq!(gw.store().query(), DEFAULT_QUANTUM);
    }

    #[test]
    fn register_with_short_buffer_fails_and_records_nothing() {
        let gw = gateway();
        let resp = run(
            &gw,
            Verb::Register,
            0,
            Some(UserRegion::out(SNAPSHOT_LEN - 1)),
        );
        assert_eq!(resp.result, -14);
        assert!(gw.ledger().is_empty());
    }

    #[test]
    fn register_writes_snapshot_and_records_once() {
        let gw = gateway();
        for _ in 0..2 {
            let resp = run(&gw, Verb::Register, 0, Some(UserRegion::out(SNAPSHOT_LEN)));
            assert_eq!(resp.result, 0);
            let snap = SnapshotRecord::from_bytes(&resp.region.unwrap().data).unwrap();
            assert_eq!(snap.pid, 1001);
            assert_eq!(snap.tgid, 1000);
        }
        assert_eq!(gw.ledger().len(), 1);
    }

    #[test]
    fn tell_truncates_to_machine_int() {
        let gw = gateway();
        run(&gw, Verb::TellValue, (1i64 << 32) + 12, None);
        assert_eq!(gw.store().query(), 12);
    }
}
