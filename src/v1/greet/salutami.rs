#![forbid(unsafe_code)]

use poem::{handler, http::StatusCode, web::{Form, Query}, Request, Response};
use serde::Deserialize;

use crate::utils::errors::Errors;
use crate::utils::greet_utils::{debug_request, RequestDebug};

use super::{GreetingHandler, OutputSink, ParameterSource, GREET_PARM, STARTUP};

// ***************************************************************************
//                          Request/Response Definiions
// ***************************************************************************
// The single optional parameter of the greeting page.  The form's submit
// button also posts an "s" parameter, which is ignored here.
#[derive(Debug, Default, Deserialize)]
pub struct GreetParms {
    n: Option<String>,
}

impl ParameterSource for GreetParms {
    fn parameter(&self, name: &str) -> Option<&str> {
        if name == GREET_PARM { self.n.as_deref() } else { None }
    }
}

// Implement the debug record trait for logging.
impl RequestDebug for GreetParms {
    type Req = GreetParms;
    fn get_request_info(&self) -> String {
        let mut s = String::with_capacity(255);
        s.push_str("  Request parameters:");
        s.push_str("\n    n: ");
        s.push_str(self.n.as_deref().unwrap_or("<absent>"));
        s
    }
}

// ------------------- Response Sink -------------------
/** Accumulates the handler's output and converts it into a poem response.
 * The in-memory writes cannot fail; failures surface when poem transmits
 * the finished response, which is the host runtime's concern.
 */
#[derive(Default)]
struct HttpSink {
    content_type: Option<String>,
    body: String,
    status: Option<(StatusCode, String)>,
}

impl OutputSink for HttpSink {
    fn set_content_type(&mut self, value: &str) {
        self.content_type = Some(value.to_string());
    }

    fn write_html(&mut self, body: &str) -> Result<(), Errors> {
        self.body.push_str(body);
        Ok(())
    }

    fn send_status(&mut self, status: u16, reason: &str) -> Result<(), Errors> {
        let code = StatusCode::from_u16(status)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        self.status = Some((code, reason.to_string()));
        Ok(())
    }
}

impl HttpSink {
    fn into_response(self) -> Response {
        match self.status {
            // HTTP/2 dropped reason phrases from the wire, so the reason
            // text rides in the plain-text body instead.
            Some((code, reason)) => Response::builder().status(code).body(reason),
            None => {
                let mut builder = Response::builder().status(StatusCode::OK);
                if let Some(ct) = self.content_type {
                    builder = builder.content_type(ct);
                }
                builder.body(self.body)
            }
        }
    }
}

// ***************************************************************************
//                                 Endpoints
// ***************************************************************************
// ---------------------------------------------------------------------------
// get_salutami:
// ---------------------------------------------------------------------------
#[handler]
pub fn get_salutami(http_req: &Request, Query(parms): Query<GreetParms>) -> Response {
    respond(http_req, parms)
}

// ---------------------------------------------------------------------------
// post_salutami:
// ---------------------------------------------------------------------------
#[handler]
pub fn post_salutami(http_req: &Request,
                     Query(query): Query<GreetParms>,
                     form: Option<Form<GreetParms>>) -> Response {
    // A urlencoded form body wins over the query string when both carry the
    // name; anything else falls back to the query string.
    let parms = match form {
        Some(Form(f)) if f.n.is_some() => f,
        _ => query,
    };
    respond(http_req, parms)
}

// ***************************************************************************
//                             Private Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// respond:
// ---------------------------------------------------------------------------
/** GET and POST share one code path from here on. */
fn respond(http_req: &Request, parms: GreetParms) -> Response {
    // Conditional logging depending on log level.
    debug_request(http_req, &parms);

    let greeter = GreetingHandler::new(*STARTUP);
    let mut sink = HttpSink::default();
    greeter.dispatch(&parms, &mut sink);
    sink.into_response()
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::pages;
    use poem::{get, test::TestClient, Route};

    fn app() -> Route {
        Route::new().at("/salutami", get(get_salutami).post(post_salutami))
    }

    #[tokio::test]
    async fn get_without_name_serves_form() {
        let cli = TestClient::new(app());
        let resp = cli.get("/salutami").send().await;
        resp.assert_status_is_ok();
        resp.assert_header("content-type", "text/html;charset=UTF-8");
    }

    #[tokio::test]
    async fn get_with_name_greets() {
        let cli = TestClient::new(app());
        let resp = cli.get("/salutami").query("n", &"Ann").send().await;
        resp.assert_status_is_ok();
        resp.assert_header("content-type", "text/html;charset=UTF-8");
        resp.assert_text(pages::named_page("Ann").unwrap()).await;
    }

    #[tokio::test]
    async fn get_with_markup_is_escaped() {
        let cli = TestClient::new(app());
        let resp = cli.get("/salutami").query("n", &"<b>X</b>").send().await;
        resp.assert_status_is_ok();
        resp.assert_text(pages::named_page("<b>X</b>").unwrap()).await;
    }

    #[tokio::test]
    async fn get_with_empty_name_serves_form() {
        let cli = TestClient::new(app());
        let resp = cli.get("/salutami").query("n", &"").send().await;
        resp.assert_status_is_ok();
        resp.assert_header("content-type", "text/html;charset=UTF-8");
    }

    #[tokio::test]
    async fn post_form_body_greets() {
        let cli = TestClient::new(app());
        let resp = cli.post("/salutami")
            .header("content-type", "application/x-www-form-urlencoded")
            .body("n=Ann")
            .send().await;
        resp.assert_status_is_ok();
        resp.assert_text(pages::named_page("Ann").unwrap()).await;
    }

    #[tokio::test]
    async fn post_without_body_serves_form() {
        let cli = TestClient::new(app());
        let resp = cli.post("/salutami").send().await;
        resp.assert_status_is_ok();
        resp.assert_header("content-type", "text/html;charset=UTF-8");
    }

    #[tokio::test]
    async fn repeated_named_requests_are_identical() {
        let cli = TestClient::new(app());
        let expected = pages::named_page("Ann").unwrap();
        for _ in 0..2 {
            let resp = cli.get("/salutami").query("n", &"Ann").send().await;
            resp.assert_status_is_ok();
            resp.assert_text(expected.clone()).await;
        }
    }
}
