use std::future::Future;

use crate::modules::error::MailbotResult;

/// Runs one future per item and waits for every one of them to settle,
/// returning the individual outcomes in input order. A failed item never
/// cancels its siblings; callers inspect the returned `Result`s to count
/// successes and failures.
pub async fn join_settled<I, Item, Fut, F, O>(iter: I, f: F) -> Vec<MailbotResult<O>>
where
    I: IntoIterator<Item = Item>,
    Fut: Future<Output = MailbotResult<O>>,
    F: Fn(Item) -> Fut,
{
    let futures: Vec<Fut> = iter.into_iter().map(f).collect();
    futures::future::join_all(futures).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{modules::error::code::ErrorCode, raise_error};

    #[tokio::test]
    async fn one_failure_does_not_cancel_siblings() {
        let results = join_settled(vec![1u32, 2, 3], |n| async move {
            if n == 2 {
                Err(raise_error!("boom".into(), ErrorCode::NetworkError))
            } else {
                Ok(n * 10)
            }
        })
        .await;

        assert_eq!(results.len(), 3);
        assert_eq!(*results[0].as_ref().unwrap(), 10);
        assert!(results[1].is_err());
        assert_eq!(*results[2].as_ref().unwrap(), 30);
    }
}
