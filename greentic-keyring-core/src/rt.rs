use once_cell::sync::Lazy;
use std::future::Future;
use tokio::runtime::{self, Handle, RuntimeFlavor};

static RUNTIME: Lazy<runtime::Runtime> = Lazy::new(|| {
    runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("greentic-keyring-rt")
        .build()
        .expect("build greentic-keyring runtime")
});

/// Run a future to completion from synchronous code without nesting runtimes.
///
/// On a multi-thread runtime the current worker is handed over with
/// `block_in_place`. A current-thread runtime cannot give up its only worker, so
/// the future is driven by the keyring runtime from a scoped helper thread.
pub fn sync_await<F>(fut: F) -> F::Output
where
    F: Future + Send,
    F::Output: Send,
{
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(|| handle.block_on(fut))
        }
        Ok(_) => std::thread::scope(|scope| {
            scope
                .spawn(|| RUNTIME.block_on(fut))
                .join()
                .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
        }),
        Err(_) => RUNTIME.block_on(fut),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_outside_a_runtime() {
        assert_eq!(sync_await(async { 40 + 2 }), 42);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn runs_inside_a_multi_thread_runtime() {
        let value = sync_await(async {
            tokio::task::yield_now().await;
            "done"
        });
        assert_eq!(value, "done");
    }

    #[tokio::test]
    async fn runs_inside_a_current_thread_runtime() {
        let borrowed = String::from("borrowed");
        let value = sync_await(async {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
            borrowed.len()
        });
        assert_eq!(value, 8);
    }
}
