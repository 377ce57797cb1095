mod check;
mod flush;
mod init;
mod pending;
mod start;
mod status;
mod stop;
mod sync;

pub use check::execute as check;
pub use flush::execute as flush;
pub use init::execute as init;
pub use pending::execute as pending;
pub use start::execute as start;
pub use status::execute as status;
pub use stop::execute as stop;
pub use sync::execute as sync;

use anyhow::anyhow;

use crate::client::ClientError;

fn client_failure(error: ClientError) -> anyhow::Error {
    match error {
        ClientError::DaemonNotRunning => {
            anyhow!("the daemon is not running, launch it with `vigil start`")
        }
        ClientError::Timeout => anyhow!("timed out connecting to the daemon"),
        other => anyhow!(other),
    }
}
