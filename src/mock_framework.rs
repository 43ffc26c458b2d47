//! # Mock Framework
//!
//! Utilities for testing clients in isolation.
//!
//! Use [`create_mock_client`] to get a client and a receiver.
//! Then use helpers like [`expect_create`] or [`expect_search`] to assert behavior.

use tokio::sync::{mpsc, oneshot};

use crate::actor_framework::{Created, Entity, FrameworkError, ResourceClient, ResourceRequest};

type Reply<R> = oneshot::Sender<Result<R, FrameworkError>>;

/// Creates a mock client and a receiver for asserting requests.
///
/// Domain clients (like `AccountClient`) can then be tested without a running
/// `ResourceActor`: the test reads each request off `receiver` and answers it,
/// or holds the responder to simulate a stalled actor.
pub fn create_mock_client<T: Entity>(buffer_size: usize) -> (ResourceClient<T>, mpsc::Receiver<ResourceRequest<T>>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (ResourceClient::new(sender), receiver)
}

/// Helper to verify that the next message is a Create request
pub async fn expect_create<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::CreateParams, Option<String>, Reply<Created<T::Id>>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Create {
            params,
            idempotency_key,
            respond_to,
        }) => Some((params, idempotency_key, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a Get request
pub async fn expect_get<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Id, Reply<Option<T>>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Get { id, respond_to }) => Some((id, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a Search request
pub async fn expect_search<T: Entity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Filter, Reply<Vec<T>>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Search { filter, respond_to }) => Some((filter, respond_to)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AccountFilter, UserAccount};

    #[tokio::test]
    async fn test_mock_client() {
        let (client, mut receiver) = create_mock_client::<UserAccount>(10);

        let get_task = tokio::spawn(async move { client.get("user-1".to_string()).await });

        let (id, responder) = expect_get(&mut receiver).await.expect("Expected Get request");
        assert_eq!(id, "user-1");
        responder.send(Ok(None)).unwrap();

        assert_eq!(get_task.await.unwrap(), Ok(None));
    }

    #[tokio::test]
    async fn test_mock_search_reports_actor_dropped() {
        let (client, mut receiver) = create_mock_client::<UserAccount>(10);

        let search_task = tokio::spawn(async move {
            client
                .search(AccountFilter::new(Some("taro"), None, None))
                .await
        });

        let (filter, responder) = expect_search(&mut receiver).await.expect("Expected Search request");
        assert_eq!(filter, AccountFilter::new(Some("TARO"), None, None));
        drop(responder);

        assert_eq!(search_task.await.unwrap(), Err(FrameworkError::ActorDropped));
    }
}
