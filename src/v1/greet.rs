#![forbid(unsafe_code)]

pub mod salutami;
pub mod version;

use chrono::NaiveDateTime;
use lazy_static::lazy_static;
use log::error;

use crate::utils::errors::Errors;
use crate::utils::greet_utils::{timestamp_local, timestamp_local_to_str};
use crate::utils::pages;

// ***************************************************************************
//                                Constants
// ***************************************************************************
// The request parameter carrying the user's name.
pub const GREET_PARM        : &str = "n";
// Content type set before any page body is written.
pub const CONTENT_TYPE_HTML : &str = "text/html;charset=UTF-8";
// Shown when an error carries no message of its own.
const DEFAULT_ERROR_MSG     : &str = "Unknown error";

// ***************************************************************************
//                             Static Variables
// ***************************************************************************
// The instant the greeting subsystem became ready, recorded once per process
// and read-only thereafter.  Display-only.
lazy_static! {
    pub static ref STARTUP: NaiveDateTime = timestamp_local();
}

// ***************************************************************************
//                                  Traits
// ***************************************************************************
/// Read access to named request parameters, independent of the HTTP stack.
pub trait ParameterSource {
    fn parameter(&self, name: &str) -> Option<&str>;
}

/// Write side of one HTTP exchange.  A sink is created and consumed exactly
/// once per invocation; writes are fallible so the caller can lay out its
/// fallback path.
pub trait OutputSink {
    /// Record the content type of the body about to be written.
    fn set_content_type(&mut self, value: &str);

    /// Append HTML text to the response body.
    fn write_html(&mut self, body: &str) -> Result<(), Errors>;

    /// Abandon the body and signal a bare HTTP status with a reason text.
    fn send_status(&mut self, status: u16, reason: &str) -> Result<(), Errors>;
}

/// Server-side diagnostic stream for failures that must not reach the client.
pub trait DiagnosticSink {
    fn error(&self, message: &str);
}

/// Routes handler diagnostics to the process log.
pub struct LogDiagnostics;

impl DiagnosticSink for LogDiagnostics {
    fn error(&self, message: &str) {
        error!("{}", message);
    }
}

// ***************************************************************************
//                             GreetingHandler
// ***************************************************************************
/** The unit responding to one greeting request.  The handler holds no lock,
 * spawns no work and touches only its own parameter/sink pair plus the
 * read-only startup timestamp, so the HTTP runtime may invoke it from any
 * number of workers at once.
 */
pub struct GreetingHandler<D: DiagnosticSink = LogDiagnostics> {
    startup: NaiveDateTime,
    diag: D,
}

impl GreetingHandler<LogDiagnostics> {
    pub fn new(startup: NaiveDateTime) -> Self {
        GreetingHandler { startup, diag: LogDiagnostics }
    }
}

impl<D: DiagnosticSink> GreetingHandler<D> {
    /// Substitute the diagnostic stream, mainly for tests.
    pub fn with_diagnostics(startup: NaiveDateTime, diag: D) -> Self {
        GreetingHandler { startup, diag }
    }

    // -----------------------------------------------------------------------
    // dispatch:
    // -----------------------------------------------------------------------
    /** Route the request on the single control-flow decision in this
     * component: an absent or empty name parameter selects the anonymous
     * greeting, anything else the named greeting.  Errors from either path
     * are routed to error rendering and never propagate to the caller.
     */
    pub fn dispatch(&self, params: &impl ParameterSource, sink: &mut impl OutputSink) {
        let result = match params.parameter(GREET_PARM) {
            Some(name) if !name.is_empty() => self.render_named(name, sink),
            _ => self.render_anonymous(sink),
        };
        if let Err(e) = result {
            self.render_error(&e, sink);
        }
    }

    // -----------------------------------------------------------------------
    // render_anonymous:
    // -----------------------------------------------------------------------
    /** Emit the greeting form page with the current and startup timestamps. */
    fn render_anonymous(&self, sink: &mut impl OutputSink) -> Result<(), Errors> {
        sink.set_content_type(CONTENT_TYPE_HTML);
        let now = timestamp_local_to_str(timestamp_local());
        let startup = timestamp_local_to_str(self.startup);
        let page = pages::form_page(&now, &startup)?;
        sink.write_html(&page)
    }

    // -----------------------------------------------------------------------
    // render_named:
    // -----------------------------------------------------------------------
    /** Emit the named greeting page.  Output sanitization happens inside the
     * page renderer.
     */
    fn render_named(&self, name: &str, sink: &mut impl OutputSink) -> Result<(), Errors> {
        sink.set_content_type(CONTENT_TYPE_HTML);
        let page = pages::named_page(name)?;
        sink.write_html(&page)
    }

    // -----------------------------------------------------------------------
    // render_error:
    // -----------------------------------------------------------------------
    /** Report the failure on the diagnostic stream, then attempt the HTML
     * error page.  If that page cannot be rendered or written, fall back to a
     * bare 500 status carrying the message as its reason.  If even the status
     * cannot be sent, the failure goes to the diagnostic stream and is
     * dropped.
     *
     * WARNING: in a production environment, error messages MUST be limited to
     * generic information, not full error strings.  E.g., we may map the
     * error variant only (IO error, render error, etc.) to messages like
     * "IO Error", "Render Error", etc.
     */
    fn render_error(&self, err: &Errors, sink: &mut impl OutputSink) {
        let mut message = err.to_string();
        if message.is_empty() {
            message = DEFAULT_ERROR_MSG.to_string();
        }

        // Log the error message on the server side.
        self.diag.error(&message);

        // Attempt the HTML error page first.
        let written = pages::error_page(&message).and_then(|page| {
            sink.set_content_type(CONTENT_TYPE_HTML);
            sink.write_html(&page)
        });

        // If the error page cannot be sent, try a standard HTTP error status.
        if written.is_err() {
            if let Err(e) = sink.send_status(500, &message) {
                // If ALSO this error status cannot be notified, write to the
                // server log and stop.
                self.diag.error(&e.to_string());
            }
        }
    }
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    // Fixed startup instant so page content is predictable.
    fn startup_ts() -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2024, 9, 13).unwrap()
            .and_hms_milli_opt(9, 0, 0, 0).unwrap()
    }

    // ------------------------------ mocks ---------------------------------
    struct TestParams(Vec<(String, String)>);

    impl TestParams {
        fn with_name(n: &str) -> Self {
            TestParams(vec![("n".to_string(), n.to_string())])
        }
        fn empty() -> Self {
            TestParams(vec![])
        }
    }

    impl ParameterSource for TestParams {
        fn parameter(&self, name: &str) -> Option<&str> {
            self.0.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
        }
    }

    #[derive(Default)]
    struct TestSink {
        fail_writes: usize,     // how many write_html calls fail, in order
        fail_status: bool,
        write_attempts: usize,
        content_type: Option<String>,
        body: String,
        status: Option<(u16, String)>,
    }

    impl OutputSink for TestSink {
        fn set_content_type(&mut self, value: &str) {
            self.content_type = Some(value.to_string());
        }
        fn write_html(&mut self, body: &str) -> Result<(), Errors> {
            self.write_attempts += 1;
            if self.write_attempts <= self.fail_writes {
                return Err(Errors::ResponseWriteError("boom".to_string()));
            }
            self.body.push_str(body);
            Ok(())
        }
        fn send_status(&mut self, status: u16, reason: &str) -> Result<(), Errors> {
            if self.fail_status {
                return Err(Errors::StatusNotifyError(reason.to_string()));
            }
            self.status = Some((status, reason.to_string()));
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct RecordingDiag {
        messages: Rc<RefCell<Vec<String>>>,
    }

    impl DiagnosticSink for RecordingDiag {
        fn error(&self, message: &str) {
            self.messages.borrow_mut().push(message.to_string());
        }
    }

    // ------------------------------ tests ---------------------------------
    #[test]
    fn anonymous_greeting_renders_form() {
        let handler = GreetingHandler::new(startup_ts());
        let mut sink = TestSink::default();
        handler.dispatch(&TestParams::empty(), &mut sink);

        assert_eq!(sink.content_type.as_deref(), Some(CONTENT_TYPE_HTML));
        assert!(sink.status.is_none());
        assert!(sink.body.contains("<form method=\"get\" action=\"salutami\">"));
        assert!(sink.body.contains("Current timestamp is "));
        assert!(sink.body.contains("I'm greeting all users since 2024-09-13T09:00:00.000"));
    }

    #[test]
    fn empty_name_renders_form() {
        let handler = GreetingHandler::new(startup_ts());
        let mut sink = TestSink::default();
        handler.dispatch(&TestParams::with_name(""), &mut sink);

        assert!(sink.body.contains("What is your name?"));
        assert!(!sink.body.contains("Hello, !"));
    }

    #[test]
    fn named_greeting() {
        let handler = GreetingHandler::new(startup_ts());
        let mut sink = TestSink::default();
        handler.dispatch(&TestParams::with_name("World"), &mut sink);

        assert_eq!(sink.content_type.as_deref(), Some(CONTENT_TYPE_HTML));
        assert!(sink.status.is_none());
        assert!(sink.body.contains("<p>Hello, World!</p>"));
    }

    #[test]
    fn named_greeting_neutralizes_markup() {
        let handler = GreetingHandler::new(startup_ts());
        let mut sink = TestSink::default();
        handler.dispatch(&TestParams::with_name("<b>X</b>"), &mut sink);

        assert!(sink.body.contains("&lt;b&gt;X&lt;/b&gt;"));
        assert!(!sink.body.contains("<b>"));
    }

    #[test]
    fn named_greeting_is_idempotent() {
        let handler = GreetingHandler::new(startup_ts());
        let mut first = TestSink::default();
        let mut second = TestSink::default();
        handler.dispatch(&TestParams::with_name("Ann"), &mut first);
        handler.dispatch(&TestParams::with_name("Ann"), &mut second);

        assert_eq!(first.body, second.body);
    }

    #[test]
    fn write_failure_renders_error_page() {
        let diag = RecordingDiag::default();
        let handler = GreetingHandler::with_diagnostics(startup_ts(), diag.clone());
        // The greeting write fails, the error page write succeeds.
        let mut sink = TestSink { fail_writes: 1, ..Default::default() };
        handler.dispatch(&TestParams::with_name("Ann"), &mut sink);

        assert!(sink.status.is_none());
        assert!(sink.body.contains("boom"));
        let messages = diag.messages.borrow();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("boom"));
    }

    #[test]
    fn error_page_failure_falls_back_to_500() {
        let diag = RecordingDiag::default();
        let handler = GreetingHandler::with_diagnostics(startup_ts(), diag.clone());
        // Both the greeting write and the error page write fail.
        let mut sink = TestSink { fail_writes: 2, ..Default::default() };
        handler.dispatch(&TestParams::with_name("Ann"), &mut sink);

        assert!(sink.body.is_empty());
        let (status, reason) = sink.status.clone().expect("fallback status expected");
        assert_eq!(status, 500);
        assert!(reason.contains("boom"));
    }

    #[test]
    fn status_failure_is_logged_and_dropped() {
        let diag = RecordingDiag::default();
        let handler = GreetingHandler::with_diagnostics(startup_ts(), diag.clone());
        let mut sink = TestSink { fail_writes: 2, fail_status: true, ..Default::default() };
        handler.dispatch(&TestParams::with_name("Ann"), &mut sink);

        assert!(sink.body.is_empty());
        assert!(sink.status.is_none());
        let messages = diag.messages.borrow();
        assert_eq!(messages.len(), 2);
        assert!(messages[1].contains("Unable to send the HTTP error status"));
    }

    #[test]
    fn empty_error_message_gets_default() {
        let diag = RecordingDiag::default();
        let handler = GreetingHandler::with_diagnostics(startup_ts(), diag.clone());
        let mut sink = TestSink::default();
        handler.render_error(&Errors::GreetError(String::new()), &mut sink);

        assert!(sink.body.contains("Unknown error"));
        assert!(diag.messages.borrow()[0].contains("Unknown error"));
    }
}
