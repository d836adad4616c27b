mod test_util;

use futures::future::join_all;
use productivity_client::domain::Error;
use productivity_client::domain::auth::driving_ports::AuthPort;
use productivity_client::domain::auth::{AuthService, LoginRequest};
use productivity_client::domain::filters::MonthFilter;
use productivity_client::domain::session::SessionStatus;
use productivity_client::domain::task::driven_ports::TaskReader;
use productivity_client::domain::task::driving_ports::TaskPort;
use productivity_client::domain::task::{TaskService, TaskStatus, TaskViewQuery, ViewMode};
use productivity_client::domain::view::ListView;
use productivity_client::remote::{ApiClient, ReqwestTransport};
use speculoos::prelude::*;
use std::sync::atomic::Ordering;
use test_util::{MockBackend, USER_ID, task_json};

fn june_board() -> TaskViewQuery {
    TaskViewQuery::new(
        ViewMode::Board,
        MonthFilter {
            year: 2025,
            month: 6,
        },
    )
}

async fn logged_in(backend: &MockBackend) -> (ApiClient<ReqwestTransport>, AuthService) {
    let client = backend.client();
    let auth = AuthService::new();
    auth.login(
        LoginRequest {
            email: "alice@example.com".to_owned(),
            password: "secret".to_owned(),
        },
        &client,
    )
    .await
    .expect("login should succeed");

    (client, auth)
}

mod auth {
    use super::*;

    #[tokio::test]
    async fn verify_reports_logged_out_before_login() {
        let backend = MockBackend::start(vec![]).await;
        let client = backend.client();
        let auth = AuthService::new();

        let user = auth.verify(&client).await;

        assert_that!(user).is_ok().is_none();
        assert_eq!(0, backend.state.refresh_calls.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn login_cookie_rides_along_on_later_requests() {
        let backend = MockBackend::start(vec![]).await;
        let (client, auth) = logged_in(&backend).await;

        let user = auth.verify(&client).await;

        assert_that!(user)
            .is_ok()
            .is_some()
            .matches(|user| user.id == USER_ID);
        assert_that!(auth.current_user()).is_some();
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let backend = MockBackend::start(vec![]).await;
        let auth = AuthService::new();

        let result = auth
            .login(
                LoginRequest {
                    email: "alice@example.com".to_owned(),
                    password: "guess".to_owned(),
                },
                &backend.client(),
            )
            .await;

        let Err(Error::Rejected { message, .. }) = result else {
            panic!("Expected the login to be rejected, got {result:#?}");
        };
        assert_eq!("Invalid email or password", message);
    }
}

mod session_refresh {
    use super::*;

    #[tokio::test]
    async fn expired_session_is_refreshed_once_for_concurrent_requests() {
        let backend = MockBackend::start(vec![task_json(7, "Pay rent", "To Do")]).await;
        let (client, _) = logged_in(&backend).await;
        backend.state.expire_sessions();

        let results = join_all((0..5).map(|_| client.task_by_id(7, USER_ID))).await;

        assert_eq!(1, backend.state.refresh_calls.load(Ordering::SeqCst));
        for result in results {
            assert_that!(result).is_ok().matches(|task| task.id == 7);
        }
        assert_eq!(SessionStatus::Active, client.session().status());
    }

    #[tokio::test]
    async fn failed_refresh_expires_the_session() {
        let backend = MockBackend::start(vec![task_json(7, "Pay rent", "To Do")]).await;
        let (client, _) = logged_in(&backend).await;
        backend.state.expire_sessions();
        backend.state.revoke_refresh();

        let results = join_all((0..3).map(|_| client.task_by_id(7, USER_ID))).await;

        assert_eq!(1, backend.state.refresh_calls.load(Ordering::SeqCst));
        assert_eq!(3, backend.state.unauthorized_responses.load(Ordering::SeqCst));
        for result in results {
            assert_that!(result).is_err();
        }
        assert!(matches!(
            client.session().status(),
            SessionStatus::Expired { .. }
        ));
    }
}

mod task_board {
    use super::*;

    #[tokio::test]
    async fn moving_a_card_updates_board_and_server() {
        let backend = MockBackend::start(vec![
            task_json(1, "Write report", "To Do"),
            task_json(5, "Pay rent", "To Do"),
            task_json(9, "File taxes", "Done"),
        ])
        .await;
        let (client, _) = logged_in(&backend).await;
        let tasks = TaskService::new();
        let query = june_board();

        let view = tasks.view(USER_ID, &query, &client).await;
        let Ok(ListView::Kanban(board)) = view else {
            panic!("Expected a board, got {view:#?}");
        };
        assert_eq!(3, board.total_count);

        let moved = tasks
            .move_status(5, USER_ID, &query, TaskStatus::Done, &client, &client)
            .await;

        assert_that!(moved)
            .is_ok()
            .matches(|task| task.status == TaskStatus::Done);
        assert_eq!(Some("Done".to_owned()), backend.state.task_status(5));
        let Some(ListView::Kanban(board)) = tasks.cached(&query) else {
            panic!("Expected the board to stay cached");
        };
        assert_eq!(1, board.columns["todo"].total_count);
        assert_eq!(2, board.columns["done"].total_count);
        assert_eq!(3, board.total_count);
    }
}
