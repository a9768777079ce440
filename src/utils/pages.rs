#![forbid(unsafe_code)]

use lazy_static::lazy_static;
use tera::{Context, Tera};

use crate::utils::errors::Errors;

// ***************************************************************************
//                                Constants
// ***************************************************************************
// Page titles.
const GREET_TITLE : &str = "Salutami!";
const ERROR_TITLE : &str = "ERROR";

// Template names.
const BASE_PAGE   : &str = "base";
const FORM_PAGE   : &str = "greet_form";
const NAMED_PAGE  : &str = "greet_named";
const ERROR_PAGE  : &str = "greet_error";

// The shared page shell.  All pages extend this template.
const BASE_TEMPLATE: &str = "\
<!DOCTYPE html>
<html>
<head>
<meta charset=\"UTF-8\"/>
<title>{{ title }}</title>
</head>
<body>
<h1>{{ title }}</h1>
{% block content %}{% endblock content %}
</body>
</html>
";

// The anonymous greeting form with the live and startup timestamps.
const FORM_TEMPLATE: &str = "\
{% extends \"base\" %}\
{% block content %}<p>Hello!</p>
<form method=\"get\" action=\"salutami\">
<p>What is your name?
<input type=\"text\" name=\"n\"/>
<input type=\"submit\" name=\"s\" value=\"Hello!\"/>
</p>
</form>
<p><small>Current timestamp is {{ now }}</small></p>
<p><small>I'm greeting all users since {{ startup }}</small></p>
{% endblock content %}";

// The named greeting.  The name is escaped before insertion.
const NAMED_TEMPLATE: &str = "\
{% extends \"base\" %}\
{% block content %}<p>Hello, {{ name }}!</p>
{% endblock content %}";

// The error page.  The message is inserted as-is.
const ERROR_TEMPLATE: &str = "\
{% extends \"base\" %}\
{% block content %}<p>{{ message }}</p>
{% endblock content %}";

// ***************************************************************************
//                             Static Variables
// ***************************************************************************
// Compile the embedded templates once per process.
lazy_static! {
    static ref TEMPLATES: Tera = init_templates();
}

// ***************************************************************************
//                              Public Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// form_page:
// ---------------------------------------------------------------------------
/** Render the anonymous greeting page: a GET form targeting the greeting
 * path plus the current and startup timestamps, both preformatted by the
 * caller as ISO-8601 local date-times.
 */
pub fn form_page(now: &str, startup: &str) -> Result<String, Errors> {
    let mut ctx = Context::new();
    ctx.insert("title", GREET_TITLE);
    ctx.insert("now", now);
    ctx.insert("startup", startup);
    render(FORM_PAGE, &ctx)
}

// ---------------------------------------------------------------------------
// named_page:
// ---------------------------------------------------------------------------
/** Render the named greeting page.  The name is sanitized here, at output
 * time, so any markup in it lands in the page as literal text.
 */
pub fn named_page(name: &str) -> Result<String, Errors> {
    let mut ctx = Context::new();
    ctx.insert("title", GREET_TITLE);
    ctx.insert("name", &sanitize_html(name));
    render(NAMED_PAGE, &ctx)
}

// ---------------------------------------------------------------------------
// error_page:
// ---------------------------------------------------------------------------
/** Render the error page.  The message is NOT sanitized, which matches the
 * rest of this example's error handling: raw messages are shown to the user
 * and production systems must map them to generic text instead.
 */
pub fn error_page(message: &str) -> Result<String, Errors> {
    let mut ctx = Context::new();
    ctx.insert("title", ERROR_TITLE);
    ctx.insert("message", message);
    render(ERROR_PAGE, &ctx)
}

// ---------------------------------------------------------------------------
// sanitize_html:
// ---------------------------------------------------------------------------
/** A basic output sanitizer that neutralizes markup by rewriting the HTML
 * metacharacters as entities.  The ampersand must be replaced first.
 *
 * This is a placeholder for a real HTML sanitizer, kept small on purpose.
 */
pub fn sanitize_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

// ***************************************************************************
//                             Private Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// init_templates:
// ---------------------------------------------------------------------------
/** Load the embedded templates.  The templates are static so a failure here
 * is a build defect and aborts the process on first use.
 */
fn init_templates() -> Tera {
    let mut tera = Tera::default();
    // Escaping is applied explicitly at the call sites above.
    tera.autoescape_on(vec![]);
    match tera.add_raw_templates(vec![
        (BASE_PAGE, BASE_TEMPLATE),
        (FORM_PAGE, FORM_TEMPLATE),
        (NAMED_PAGE, NAMED_TEMPLATE),
        (ERROR_PAGE, ERROR_TEMPLATE),
    ]) {
        Ok(_) => tera,
        Err(e) => {
            panic!("Unable to load the embedded page templates: {}", e);
        }
    }
}

// ---------------------------------------------------------------------------
// render:
// ---------------------------------------------------------------------------
fn render(page: &str, ctx: &Context) -> Result<String, Errors> {
    TEMPLATES.render(page, ctx)
        .map_err(|e| Errors::PageRenderError(page.to_string(), e.to_string()))
}
