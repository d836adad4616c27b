use crate::domain::DrivenPortError;
use anyhow::anyhow;

/// Whether a fake remote should behave as if the backend is reachable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    Connected,
    Disconnected,
}

impl Connectivity {
    /// Fails with a communication error when the fake is "offline"
    pub fn blow_up_if_disconnected(&self) -> Result<(), DrivenPortError> {
        match self {
            Self::Connected => Ok(()),
            Self::Disconnected => Err(DrivenPortError::CommsFailure(anyhow!(
                "could not reach the backend!"
            ))),
        }
    }
}

/// Records the arguments a faked port method was called with and hands back a canned result.
///
/// Fakes wrap themselves in a lock so the port methods can record calls through `&self`:
///
/// ```ignore
/// impl ExpenseWriter for RwLock<FakeExpenseRemote> {
///     async fn delete_expense(&self, id: i64, user_id: i64) -> Result<String, DrivenPortError> {
///         let mut remote = self.write().unwrap();
///         remote.delete_calls.save_arguments((id, user_id));
///         remote.delete_calls.return_value_result()
///     }
/// }
/// ```
pub struct FakeImplementation<Args, Ret> {
    saved_arguments: Vec<Args>,
    return_value: Option<Ret>,
}

impl<Args, Ret> FakeImplementation<Args, Ret> {
    pub fn new() -> FakeImplementation<Args, Ret> {
        FakeImplementation {
            saved_arguments: Vec::new(),
            return_value: None,
        }
    }

    pub fn save_arguments(&mut self, arguments: Args) {
        self.saved_arguments.push(arguments)
    }

    /// Arguments of every call so far, oldest first
    pub fn calls(&self) -> &[Args] {
        self.saved_arguments.as_slice()
    }

    pub fn has_return_value(&self) -> bool {
        self.return_value.is_some()
    }
}

#[allow(dead_code)]
impl<Args, Ret: Clone> FakeImplementation<Args, Ret> {
    pub fn set_return_value(&mut self, return_value: Ret) {
        self.return_value = Some(return_value)
    }

    pub fn return_value(&self) -> Ret {
        match self.return_value {
            None => panic!("Fake was called before its return value was set!"),
            Some(ref ret_val) => ret_val.clone(),
        }
    }
}

impl<Args, Success: Clone> FakeImplementation<Args, Result<Success, DrivenPortError>> {
    /// Sets the result handed back on every call. [DrivenPortError] isn't [Clone], so errors are
    /// rebuilt from their variant on each call.
    pub fn set_returned_result(&mut self, result: Result<Success, DrivenPortError>) {
        self.return_value = Some(result)
    }

    pub fn return_value_result(&self) -> Result<Success, DrivenPortError> {
        match self.return_value {
            None => panic!("Fake was called before its result was set!"),
            Some(Ok(ref ok_result)) => Ok(ok_result.clone()),
            Some(Err(ref err)) => Err(copy_port_error(err)),
        }
    }
}

fn copy_port_error(err: &DrivenPortError) -> DrivenPortError {
    match err {
        DrivenPortError::CommsFailure(cause) => DrivenPortError::CommsFailure(anyhow!("{cause}")),
        DrivenPortError::DoesNotExist => DrivenPortError::DoesNotExist,
        DrivenPortError::Rejected { status, message } => DrivenPortError::Rejected {
            status: *status,
            message: message.clone(),
        },
        DrivenPortError::SessionExpired(reason) => DrivenPortError::SessionExpired(reason.clone()),
    }
}
