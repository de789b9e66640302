//! Login protocol tests against a mock provider.

use mockito::{Matcher, Server, ServerGuard};
use reqwest::Url;

use steamrs::{Error, SteamClient, SteamUrls};

// 512-bit odd modulus; any well-formed key material works for the mock
// provider since nothing decrypts the submission.
const RSA_MOD_HEX: &str = "800000000000000000000000000000000000000000000000000000000000f182\
80000000000000000000000000000000000000000000000000000000491e8f5f";
const RSA_EXP_HEX: &str = "010001";

const GUARD_JSON: &str = r#"{
    "steamid": "76561197960287930",
    "shared_secret": "ONUGC4TFMQWXGZLDOJSXILLBMJRWIZLG",
    "identity_secret": "NFSGK3TUNF2HSLLTMVRXEZLUFUYDCMRT"
}"#;

fn client_for(server: &ServerGuard) -> SteamClient {
    let url = Url::parse(&server.url()).unwrap();
    let urls = SteamUrls {
        community: url.clone(),
        store: url.clone(),
        api: url,
    };
    SteamClient::with_urls(urls, Some("APIKEY".to_string())).unwrap()
}

fn rsa_key_body() -> String {
    format!(
        r#"{{"success":true,"publickey_mod":"{RSA_MOD_HEX}","publickey_exp":"{RSA_EXP_HEX}","timestamp":"216071750000"}}"#
    )
}

#[tokio::test]
async fn login_retries_with_two_factor_code_then_normalizes_session() {
    let mut server = Server::new_async().await;

    let rsa_mock = server
        .mock("POST", "/login/getrsakey/")
        .with_body(rsa_key_body())
        .expect(2)
        .create_async()
        .await;

    // First submission carries an empty code and is bounced to 2FA.
    let first_submit = server
        .mock("POST", "/login/dologin/")
        .match_body(Matcher::UrlEncoded("twofactorcode".into(), "".into()))
        .with_body(r#"{"success":false,"requires_twofactor":true}"#)
        .expect(1)
        .create_async()
        .await;

    // Exactly one resubmission, carrying a freshly generated 8-digit code.
    let transfer_one = format!("{}/transfer/one", server.url());
    let transfer_two = format!("{}/transfer/two", server.url());
    let second_submit = server
        .mock("POST", "/login/dologin/")
        .match_body(Matcher::Regex(r"twofactorcode=\d{8}".to_string()))
        .with_body(format!(
            r#"{{"success":true,"transfer_urls":["{transfer_one}","{transfer_two}"],
               "transfer_parameters":{{"steamid":"76561197960287930","auth":"deadbeef","remember_login":false}}}}"#
        ))
        .expect(1)
        .create_async()
        .await;

    let transfer_one_mock = server
        .mock("POST", "/transfer/one")
        .match_body(Matcher::UrlEncoded("auth".into(), "deadbeef".into()))
        .with_header("Set-Cookie", "sessionid=testsession; Path=/")
        .with_body("ok")
        .expect(1)
        .create_async()
        .await;
    let transfer_two_mock = server
        .mock("POST", "/transfer/two")
        .with_body("ok")
        .expect(1)
        .create_async()
        .await;

    let mut client = client_for(&server);
    client.login("gaben", "hunter2", GUARD_JSON).await.unwrap();

    rsa_mock.assert_async().await;
    first_submit.assert_async().await;
    second_submit.assert_async().await;
    transfer_one_mock.assert_async().await;
    transfer_two_mock.assert_async().await;

    // The session identifier is observable through the surface every
    // downstream feature uses.
    assert_eq!(client.session_id().as_deref(), Some("testsession"));
}

#[tokio::test]
async fn captcha_is_terminal_with_no_resubmission() {
    let mut server = Server::new_async().await;

    server
        .mock("POST", "/login/getrsakey/")
        .with_body(rsa_key_body())
        .create_async()
        .await;
    let submit = server
        .mock("POST", "/login/dologin/")
        .with_body(r#"{"success":false,"captcha_needed":true}"#)
        .expect(1)
        .create_async()
        .await;

    let mut client = client_for(&server);
    let result = client.login("gaben", "hunter2", GUARD_JSON).await;
    assert!(matches!(result, Err(Error::CaptchaRequired)));
    submit.assert_async().await;
    assert!(client.session_id().is_none());
}

#[tokio::test]
async fn rejected_credentials_surface_the_raw_body() {
    let mut server = Server::new_async().await;

    server
        .mock("POST", "/login/getrsakey/")
        .with_body(rsa_key_body())
        .create_async()
        .await;
    server
        .mock("POST", "/login/dologin/")
        .with_body(r#"{"success":false,"message":"The account name or password is incorrect."}"#)
        .create_async()
        .await;

    let mut client = client_for(&server);
    match client.login("gaben", "wrong", GUARD_JSON).await {
        Err(Error::InvalidCredentials(raw)) => {
            assert!(raw.contains("account name or password"));
        }
        other => panic!("expected InvalidCredentials, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_transfer_setup_is_a_protocol_change() {
    let mut server = Server::new_async().await;

    server
        .mock("POST", "/login/getrsakey/")
        .with_body(rsa_key_body())
        .create_async()
        .await;
    server
        .mock("POST", "/login/dologin/")
        .with_body(r#"{"success":true}"#)
        .create_async()
        .await;

    let mut client = client_for(&server);
    let result = client.login("gaben", "hunter2", GUARD_JSON).await;
    assert!(matches!(result, Err(Error::RedirectSetupMissing)));
}

#[tokio::test]
async fn incomplete_rsa_key_shape_is_retried_then_exhausted() {
    let mut server = Server::new_async().await;

    let rsa_mock = server
        .mock("POST", "/login/getrsakey/")
        .with_body(r#"{"success":false}"#)
        .expect(5)
        .create_async()
        .await;

    let mut client = client_for(&server);
    let result = client.login("gaben", "hunter2", GUARD_JSON).await;
    assert!(matches!(result, Err(Error::KeyFetchExhausted(5))));
    rsa_mock.assert_async().await;
}

#[tokio::test]
async fn authenticated_operations_fail_fast_before_login() {
    let server = Server::new_async().await;
    let client = client_for(&server);

    // No mock is registered: a request hitting the server would fail the
    // test through an unexpected-request error rather than NotAuthenticated.
    let result = client.confirm_trade_offer("123").await;
    assert!(matches!(result, Err(Error::NotAuthenticated)));

    let result = client.get_my_inventory(&steamrs::GameOptions::tf2(), true).await;
    assert!(matches!(result, Err(Error::NotAuthenticated)));
}

#[tokio::test]
async fn logout_failure_keeps_local_state() {
    let mut server = Server::new_async().await;

    server
        .mock("POST", "/login/getrsakey/")
        .with_body(rsa_key_body())
        .create_async()
        .await;
    let transfer = format!("{}/transfer/one", server.url());
    server
        .mock("POST", "/login/dologin/")
        .with_body(format!(
            r#"{{"success":true,"transfer_urls":["{transfer}"],
               "transfer_parameters":{{"auth":"x","remember_login":false}}}}"#
        ))
        .create_async()
        .await;
    server
        .mock("POST", "/transfer/one")
        .with_header("Set-Cookie", "sessionid=testsession; Path=/")
        .with_body("ok")
        .create_async()
        .await;
    server
        .mock("POST", "/logout/")
        .with_body("ok")
        .create_async()
        .await;
    // The community page still shows the username: the provider did not
    // actually drop the session.
    server
        .mock("GET", "/")
        .with_body("<html>logged in as gaben</html>")
        .create_async()
        .await;

    let mut client = client_for(&server);
    client.login("gaben", "hunter2", GUARD_JSON).await.unwrap();

    let result = client.logout().await;
    assert!(matches!(result, Err(Error::LogoutFailed)));
    // State was not silently cleared; the session is still usable locally.
    assert!(client.session_id().is_some());
}
