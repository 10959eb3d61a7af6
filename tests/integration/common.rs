use std::path::Path;
use sumi_harvest::config::{parse_config, Config};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Builds a fast test configuration pointed at `server_uri`
///
/// `extra` is appended verbatim and carries `[session]` and `[[source]]`
/// tables.
pub fn test_config(server_uri: &str, dir: &Path, batch_size: usize, extra: &str) -> Config {
    let host = url::Url::parse(server_uri)
        .expect("Failed to parse server URI")
        .host_str()
        .expect("Server URI has no host")
        .to_string();

    let toml = format!(
        r#"
[harvest]
base-delay = 0
max-retries = 2
backoff-multiplier = 1.0
batch-size = {batch_size}
batch-delay = 0
save-interval = 2
diff-mode = true
min-content-length = 50

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[output]
index-dir = "{index}"
archive-dir = "{archive}"

[discovery]
article-hosts = ["{host}"]
article-prefixes = ["/archives/", "/articles/"]
max-page-retries = 2
page-retry-delay = 0

{extra}
"#,
        index = dir.join("index").display(),
        archive = dir.join("archive").display(),
    );

    parse_config(&toml).expect("Test config should be valid")
}

/// A `[[source]]` table
pub fn source(kind: &str, name: &str, url: &str) -> String {
    format!("[[source]]\nkind = \"{}\"\nname = \"{}\"\nurl = \"{}\"\n", kind, name, url)
}

/// A sitemap-style listing of `urls`
pub fn sitemap(urls: &[String]) -> String {
    let mut body = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset>\n");
    for url in urls {
        body.push_str(&format!("  <url><loc>{}</loc></url>\n", url));
    }
    body.push_str("</urlset>\n");
    body
}

/// An article page long enough to pass extraction
pub fn article_html(title: &str) -> String {
    format!(
        r#"<html><head><title>{title} | Site</title></head><body>
        <nav><a href="/">Home</a></nav>
        <article class="post">
          <h1 class="post-title">{title}</h1>
          <span class="category">Research</span>
          <time datetime="2024-05-01">May 1</time>
          <p>{title} opens with a paragraph of real text, with commas, clauses, and detail.</p>
          <p>The second paragraph keeps going, adding context, numbers, and a conclusion.</p>
        </article>
        </body></html>"#
    )
}

/// Serves `body` as HTML at `route`
pub async fn mount_html(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

/// Every `.md` file under `dir`
pub fn markdown_files(dir: &Path) -> Vec<std::path::PathBuf> {
    let mut files = Vec::new();
    let Ok(entries) = std::fs::read_dir(dir) else {
        return files;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            files.extend(markdown_files(&path));
        } else if path.extension().is_some_and(|ext| ext == "md") {
            files.push(path);
        }
    }
    files.sort();
    files
}
