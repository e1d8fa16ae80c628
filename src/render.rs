/// Presentation
///
/// Handlers build a context mapping of named values (`page_obj`, `post`,
/// `form`, `comments`, `author`, `following`, ...) and name a template;
/// the renderer turns that into the response body. The contract is a
/// trait so presentation stays an interchangeable collaborator; the
/// built-in `HtmlRenderer` emits plain server-side HTML.
use serde_json::{Map, Value};

use crate::error::{AppError, Result};

/// Named values a template renders from
pub type Context = Map<String, Value>;

pub trait TemplateRenderer: Send + Sync {
    fn render(&self, template: &str, ctx: &Context) -> Result<String>;
}

/// Escape text for HTML element and attribute positions.
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Built-in HTML renderer
pub struct HtmlRenderer;

impl TemplateRenderer for HtmlRenderer {
    fn render(&self, template: &str, ctx: &Context) -> Result<String> {
        let (title, content) = match template {
            "index" => ("Latest posts".to_string(), index_content(ctx)),
            "group_list" => (
                format!("Group: {}", str_in(ctx.get("group"), "title")),
                group_content(ctx),
            ),
            "profile" => (
                format!("Profile: {}", str_in(ctx.get("author"), "username")),
                profile_content(ctx),
            ),
            "post_detail" => ("Post".to_string(), post_detail_content(ctx)),
            "create_post" => (
                if bool_at(ctx, "is_edit") {
                    "Edit post".to_string()
                } else {
                    "New post".to_string()
                },
                post_form_content(ctx),
            ),
            "follow" => ("Your feed".to_string(), feed_content(ctx)),
            "login" => ("Log in".to_string(), login_content(ctx)),
            "signup" => ("Sign up".to_string(), signup_content(ctx)),
            other => {
                return Err(AppError::Internal(format!("unknown template: {}", other)));
            }
        };

        Ok(layout(&title, &content, ctx))
    }
}

// ---------------------------------------------------------------------
// Context access helpers
// ---------------------------------------------------------------------

fn str_at<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or("")
}

fn str_in<'a>(value: Option<&'a Value>, key: &str) -> &'a str {
    value.map(|v| str_at(v, key)).unwrap_or("")
}

fn bool_at(ctx: &Context, key: &str) -> bool {
    ctx.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn i64_at(value: &Value, key: &str) -> i64 {
    value.get(key).and_then(Value::as_i64).unwrap_or(0)
}

fn form_error<'a>(form: Option<&'a Value>, field: &str) -> Option<&'a str> {
    form?.get("errors")?.get(field)?.as_str()
}

fn error_line(form: Option<&Value>, field: &str) -> String {
    match form_error(form, field) {
        Some(msg) => format!("<p class=\"error\">{}</p>", escape(msg)),
        None => String::new(),
    }
}

fn date_of(value: &Value) -> String {
    // created_at is RFC 3339; the date part is enough for display
    let raw = str_at(value, "created_at");
    raw.chars().take(10).collect()
}

// ---------------------------------------------------------------------
// Shared fragments
// ---------------------------------------------------------------------

fn layout(title: &str, content: &str, ctx: &Context) -> String {
    let nav = match ctx.get("user").filter(|u| !u.is_null()) {
        Some(user) => {
            let username = str_at(user, "username");
            format!(
                "<a href=\"/\">Home</a> \
                 <a href=\"/follow/\">Feed</a> \
                 <a href=\"/create/\">New post</a> \
                 <a href=\"/profile/{u}/\">{name}</a> \
                 <form class=\"inline\" method=\"post\" action=\"/auth/logout/\">\
                 <button type=\"submit\">Log out</button></form>",
                u = escape(username),
                name = escape(username),
            )
        }
        None => "<a href=\"/\">Home</a> \
                 <a href=\"/auth/login/\">Log in</a> \
                 <a href=\"/auth/signup/\">Sign up</a>"
            .to_string(),
    };

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title} | Quill</title>\n</head>\n<body>\n\
         <nav>{nav}</nav>\n<main>\n<h1>{title}</h1>\n{content}\n</main>\n</body>\n</html>\n",
        title = escape(title),
        nav = nav,
        content = content,
    )
}

fn post_article(post: &Value) -> String {
    let author = str_at(post, "author_username");
    let id = i64_at(post, "id");
    let group = match post.get("group_slug").and_then(Value::as_str) {
        Some(slug) => format!(
            " in <a href=\"/group/{slug}/\">{title}</a>",
            slug = escape(slug),
            title = escape(str_at(post, "group_title")),
        ),
        None => String::new(),
    };
    let image = match post.get("image").and_then(Value::as_str) {
        Some(path) => format!("<img src=\"/media/{}\" alt=\"\">", escape(path)),
        None => String::new(),
    };

    format!(
        "<article class=\"post\">\
         <header><a href=\"/profile/{author}/\">{author}</a> on {date}{group}</header>\
         <p>{text}</p>{image}\
         <footer><a href=\"/posts/{id}/\">Permalink</a></footer>\
         </article>",
        author = escape(author),
        date = date_of(post),
        group = group,
        text = escape(str_at(post, "text")),
        image = image,
        id = id,
    )
}

fn post_list(page_obj: Option<&Value>) -> String {
    let items = page_obj
        .and_then(|p| p.get("items"))
        .and_then(Value::as_array);
    match items {
        Some(items) if !items.is_empty() => items.iter().map(post_article).collect(),
        _ => "<p>No posts yet.</p>".to_string(),
    }
}

fn pagination_nav(page_obj: Option<&Value>) -> String {
    let Some(page) = page_obj else {
        return String::new();
    };
    let number = i64_at(page, "number");
    let total = i64_at(page, "total_pages");
    if total <= 1 {
        return String::new();
    }

    let previous = if page.get("has_previous").and_then(Value::as_bool) == Some(true) {
        format!("<a href=\"?page={}\">previous</a> ", number - 1)
    } else {
        String::new()
    };
    let next = if page.get("has_next").and_then(Value::as_bool) == Some(true) {
        format!(" <a href=\"?page={}\">next</a>", number + 1)
    } else {
        String::new()
    };

    format!(
        "<nav class=\"pagination\">{previous}page {number} of {total}{next}</nav>",
        previous = previous,
        number = number,
        total = total,
        next = next,
    )
}

fn listing(ctx: &Context) -> String {
    format!(
        "{}{}",
        post_list(ctx.get("page_obj")),
        pagination_nav(ctx.get("page_obj"))
    )
}

// ---------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------

fn index_content(ctx: &Context) -> String {
    listing(ctx)
}

fn group_content(ctx: &Context) -> String {
    format!(
        "<p>{}</p>{}",
        escape(str_in(ctx.get("group"), "description")),
        listing(ctx),
    )
}

fn profile_content(ctx: &Context) -> String {
    let author = str_in(ctx.get("author"), "username");
    let viewer = str_in(ctx.get("user"), "username");
    let authenticated = ctx.get("user").map(|u| !u.is_null()).unwrap_or(false);

    let follow_controls = if !authenticated || viewer == author {
        String::new()
    } else if bool_at(ctx, "following") {
        format!(
            "<form method=\"post\" action=\"/profile/{}/unfollow/\">\
             <button type=\"submit\">Unfollow</button></form>",
            escape(author)
        )
    } else {
        format!(
            "<form method=\"post\" action=\"/profile/{}/follow/\">\
             <button type=\"submit\">Follow</button></form>",
            escape(author)
        )
    };

    format!("{}{}", follow_controls, listing(ctx))
}

fn comment_form(ctx: &Context, post_id: i64) -> String {
    if ctx.get("user").map(|u| u.is_null()).unwrap_or(true) {
        return format!(
            "<p><a href=\"{}\">Log in</a> to leave a comment.</p>",
            escape(&crate::error::login_redirect_target(&format!(
                "/posts/{}/",
                post_id
            )))
        );
    }

    format!(
        "<form method=\"post\" action=\"/posts/{id}/comment/\">\
         {error}<textarea name=\"text\"></textarea>\
         <button type=\"submit\">Add comment</button></form>",
        id = post_id,
        error = error_line(ctx.get("form"), "text"),
    )
}

fn post_detail_content(ctx: &Context) -> String {
    let Some(post) = ctx.get("post") else {
        return String::new();
    };
    let post_id = i64_at(post, "id");

    let edit_link = if str_in(ctx.get("user"), "username") == str_at(post, "author_username") {
        format!("<p><a href=\"/posts/{}/edit/\">Edit</a></p>", post_id)
    } else {
        String::new()
    };

    let comments: String = ctx
        .get("comments")
        .and_then(Value::as_array)
        .map(|comments| {
            comments
                .iter()
                .map(|c| {
                    format!(
                        "<li><strong>{author}</strong> on {date}: {text}</li>",
                        author = escape(str_at(c, "author_username")),
                        date = date_of(c),
                        text = escape(str_at(c, "text")),
                    )
                })
                .collect()
        })
        .unwrap_or_default();

    format!(
        "{article}{edit}<section class=\"comments\"><h2>Comments</h2>{form}<ul>{comments}</ul></section>",
        article = post_article(post),
        edit = edit_link,
        form = comment_form(ctx, post_id),
        comments = comments,
    )
}

fn group_options(ctx: &Context, selected: Option<i64>) -> String {
    let mut options = String::from("<option value=\"\">— no group —</option>");
    if let Some(groups) = ctx.get("groups").and_then(Value::as_array) {
        for group in groups {
            let id = i64_at(group, "id");
            let marker = if selected == Some(id) { " selected" } else { "" };
            options.push_str(&format!(
                "<option value=\"{id}\"{marker}>{title}</option>",
                id = id,
                marker = marker,
                title = escape(str_at(group, "title")),
            ));
        }
    }
    options
}

fn post_form_content(ctx: &Context) -> String {
    let form = ctx.get("form");
    let is_edit = bool_at(ctx, "is_edit");
    let action = if is_edit {
        let post_id = form
            .and_then(|f| f.get("post_id"))
            .and_then(Value::as_i64)
            .unwrap_or(0);
        format!("/posts/{}/edit/", post_id)
    } else {
        "/create/".to_string()
    };
    let selected = form
        .and_then(|f| f.get("group_id"))
        .and_then(Value::as_i64);

    format!(
        "<form method=\"post\" action=\"{action}\" enctype=\"multipart/form-data\">\
         {text_error}<label>Text<textarea name=\"text\">{text}</textarea></label>\
         <label>Group<select name=\"group\">{options}</select></label>\
         {image_error}<label>Image<input type=\"file\" name=\"image\"></label>\
         <button type=\"submit\">{submit}</button></form>",
        action = escape(&action),
        text_error = error_line(form, "text"),
        text = escape(str_in(form, "text")),
        options = group_options(ctx, selected),
        image_error = error_line(form, "image"),
        submit = if is_edit { "Save" } else { "Publish" },
    )
}

fn feed_content(ctx: &Context) -> String {
    listing(ctx)
}

fn login_content(ctx: &Context) -> String {
    let form = ctx.get("form");
    format!(
        "<form method=\"post\" action=\"/auth/login/\">\
         {error}<label>Username<input name=\"username\" value=\"{username}\"></label>\
         <label>Password<input type=\"password\" name=\"password\"></label>\
         <input type=\"hidden\" name=\"next\" value=\"{next}\">\
         <button type=\"submit\">Log in</button></form>\
         <p><a href=\"/auth/signup/\">Need an account?</a></p>",
        error = error_line(form, "__all__"),
        username = escape(str_in(form, "username")),
        next = escape(str_in(form, "next")),
    )
}

fn signup_content(ctx: &Context) -> String {
    let form = ctx.get("form");
    format!(
        "<form method=\"post\" action=\"/auth/signup/\">\
         {username_error}<label>Username<input name=\"username\" value=\"{username}\"></label>\
         {password_error}<label>Password<input type=\"password\" name=\"password\"></label>\
         <button type=\"submit\">Sign up</button></form>",
        username_error = error_line(form, "username"),
        username = escape(str_in(form, "username")),
        password_error = error_line(form, "password"),
    )
}
