mod admin;
mod checkout;
mod helpers;
mod mocks;
mod webhook;

mod misc {
    use actix_web::{body::MessageBody, test, test::TestRequest, App};
    use donate_engine::SqliteDatabase;

    use crate::{config::ServerConfig, routes::health, server::create_server_instance};

    #[actix_web::test]
    async fn health_endpoint() {
        let app = test::init_service(App::new().service(health)).await;
        let req = TestRequest::get().uri("/health").to_request();
        let (_req, res) = test::call_service(&app, req).await.into_parts();
        assert_eq!(res.status(), 200);
        let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
        assert_eq!(body, "👍️\n");
    }

    // The factory closure owns the config, so binding must not read it afterwards.
    #[actix_web::test]
    async fn the_server_factory_builds_and_binds() {
        let db = SqliteDatabase::new_with_url("sqlite::memory:", 1).await.expect("in-memory database");
        let config = ServerConfig::new("127.0.0.1", 0);
        let srv = create_server_instance(config, db).expect("the server should build and bind");
        drop(srv);
    }
}
