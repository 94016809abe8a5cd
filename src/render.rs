use chrono::{Datelike, Utc};

use crate::{
    core::sync::{Notification, NotificationKind, ViewState},
    i18n::{Lang, Translations, LANG_QUERY},
    types::{InternalProject, QuoteForm, Review, SuccessStory, BUDGETS, CATEGORIES},
};

const WHY_US: [(&str, &str); 4] = [
    ("why.budget.title", "why.budget.body"),
    ("why.launch.title", "why.launch.body"),
    ("why.growth.title", "why.growth.body"),
    ("why.personal.title", "why.personal.body"),
];

const SERVICES: [(&str, &str, &str); 4] = [
    ("globe", "services.websites.title", "services.websites.body"),
    ("dollar-sign", "services.ecommerce.title", "services.ecommerce.body"),
    ("zap", "services.automation.title", "services.automation.body"),
    ("code", "services.custom.title", "services.custom.body"),
];

/// Ratings are shown on a five-star scale.
const MAX_STARS: i32 = 5;

const FOOTER_SOLUTIONS: [&str; 4] = [
    "quote.category.website",
    "quote.category.ecommerce",
    "quote.category.automation",
    "quote.category.custom",
];

/// Everything needed to render the single page.
pub struct Page<'a> {
    pub translations: &'a Translations,
    pub lang: Lang,
    pub view: &'a ViewState,
    pub form: &'a QuoteForm,
    pub notification: Option<&'a Notification>,
    pub analytics_id: Option<&'a str>,
}

impl Page<'_> {
    fn t(&self, key: &'static str) -> String {
        escape(self.translations.t(self.lang, key))
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("<!DOCTYPE html>\n");
        out.push_str(&format!("<html lang=\"{}\">\n<head>\n", self.lang));
        out.push_str("<meta charset=\"utf-8\">\n");
        out.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
        out.push_str(&format!("<title>Nomadicode | {}</title>\n", self.t("hero.title")));
        out.push_str("<link rel=\"stylesheet\" href=\"/index.css\">\n");
        if let Some(id) = self.analytics_id {
            out.push_str(&analytics_snippet(id));
        }
        out.push_str("</head>\n<body>\n<div class=\"min-h-screen bg-white\">\n");
        out.push_str(&self.header());
        out.push_str(&self.why_us());
        out.push_str(&self.services());
        out.push_str(&self.success_stories());
        out.push_str(&self.internal_projects());
        out.push_str(&self.reviews());
        out.push_str(&self.quote_form());
        out.push_str(&self.footer());
        if let Some(notification) = self.notification {
            out.push_str(&self.toast(notification));
        }
        out.push_str("</div>\n</body>\n</html>\n");
        out
    }

    fn header(&self) -> String {
        let mut out = String::new();
        out.push_str("<header class=\"hero\">\n<nav>\n");
        out.push_str("<img src=\"/nomadicode-logo.png\" alt=\"Nomadicode\" class=\"logo\">\n");
        out.push_str("<div class=\"nav-links\">\n");
        for (anchor, key) in [
            ("services", "nav.services"),
            ("portfolio", "nav.portfolio"),
            ("testimonials", "nav.testimonials"),
            ("contact", "nav.contact"),
        ] {
            out.push_str(&format!("<a href=\"#{}\">{}</a>\n", anchor, self.t(key)));
        }
        for lang in Lang::ALL {
            let class = if lang == self.lang { "lang active" } else { "lang" };
            out.push_str(&format!(
                "<a class=\"{}\" href=\"/?{}={}\">{}</a>\n",
                class,
                LANG_QUERY,
                lang,
                lang.code().to_uppercase()
            ));
        }
        out.push_str("</div>\n</nav>\n");
        out.push_str(&format!(
            "<div class=\"hero-body\">\n<h1>{}</h1>\n<p>{}</p>\n\
             <a href=\"#quote\" class=\"cta\">{}</a>\n</div>\n",
            self.t("hero.title"),
            self.t("hero.subtitle"),
            self.t("hero.cta")
        ));
        out.push_str("</header>\n");
        out
    }

    fn why_us(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("<section class=\"why\">\n<h2>{}</h2>\n", self.t("why.title")));
        for (title, body) in WHY_US {
            out.push_str(&format!(
                "<div class=\"card\"><h3>{}</h3><p>{}</p></div>\n",
                self.t(title),
                self.t(body)
            ));
        }
        out.push_str("</section>\n");
        out
    }

    fn services(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "<section id=\"services\">\n<h2>{}</h2>\n",
            self.t("services.title")
        ));
        for (icon, title, body) in SERVICES {
            out.push_str(&format!(
                "<div class=\"card\"><i class=\"icon icon-{}\"></i><h3>{}</h3><p>{}</p></div>\n",
                icon,
                self.t(title),
                self.t(body)
            ));
        }
        out.push_str("</section>\n");
        out
    }

    /// Loading placeholder or the rendered cards.
    fn cards<T>(&self, items: &[T], card: impl Fn(&T) -> String) -> String {
        if self.view.loading {
            return format!("<div class=\"loading\">{}</div>\n", self.t("loading"));
        }
        let mut out = String::from("<div class=\"grid\">\n");
        for item in items {
            out.push_str(&card(item));
        }
        out.push_str("</div>\n");
        out
    }

    fn success_stories(&self) -> String {
        format!(
            "<section id=\"portfolio\">\n<h2>{}</h2>\n{}</section>\n",
            self.t("stories.title"),
            self.cards(&self.view.success_stories, story_card)
        )
    }

    fn internal_projects(&self) -> String {
        let visit = self.t("projects.visit");
        let code = self.t("projects.code");
        format!(
            "<section id=\"projects\">\n<h2>{}</h2>\n{}</section>\n",
            self.t("projects.title"),
            self.cards(&self.view.internal_projects, |project| {
                project_card(project, &visit, &code)
            })
        )
    }

    fn reviews(&self) -> String {
        format!(
            "<section id=\"testimonials\">\n<h2>{}</h2>\n{}</section>\n",
            self.t("reviews.title"),
            self.cards(&self.view.reviews, review_card)
        )
    }

    fn quote_form(&self) -> String {
        let form = self.form;
        let mut out = String::new();
        out.push_str(&format!("<section id=\"quote\">\n<h2>{}</h2>\n", self.t("quote.title")));
        out.push_str("<form method=\"post\" action=\"/#quote\">\n");
        out.push_str(&format!(
            "<label>{}<input type=\"text\" name=\"name\" value=\"{}\"></label>\n",
            self.t("quote.name"),
            escape(&form.name)
        ));
        out.push_str(&format!(
            "<label>{}<input type=\"email\" name=\"email\" value=\"{}\"></label>\n",
            self.t("quote.email"),
            escape(&form.email)
        ));

        out.push_str(&format!("<label>{}<select name=\"category\">\n", self.t("quote.category")));
        for (value, key) in CATEGORIES {
            out.push_str(&option(value, &self.t(key), form.category == value));
        }
        out.push_str("</select></label>\n");

        out.push_str(&format!("<label>{}<select name=\"budget\">\n", self.t("quote.budget")));
        out.push_str(&option("", &self.t("quote.budget.placeholder"), form.budget.is_empty()));
        for (value, key) in BUDGETS {
            out.push_str(&option(value, &self.t(key), form.budget == value));
        }
        out.push_str("</select></label>\n");

        out.push_str(&format!(
            "<label>{}<textarea name=\"message\" rows=\"4\" placeholder=\"{}\">{}</textarea>\
             </label>\n",
            self.t("quote.message"),
            self.t("quote.message.placeholder"),
            escape(&form.message)
        ));
        out.push_str(&format!(
            "<button type=\"submit\">{}</button>\n</form>\n</section>\n",
            self.t("quote.submit")
        ));
        out
    }

    fn footer(&self) -> String {
        let mut out = String::new();
        out.push_str("<footer id=\"contact\">\n");
        out.push_str(&format!(
            "<div><img src=\"/nomadicode-logo.png\" alt=\"Nomadicode\" class=\"logo\">\
             <p>{}</p></div>\n",
            self.t("footer.tagline")
        ));
        out.push_str(&format!("<div><h4>{}</h4><ul>\n", self.t("footer.solutions")));
        for key in FOOTER_SOLUTIONS {
            out.push_str(&format!("<li>{}</li>\n", self.t(key)));
        }
        out.push_str("</ul></div>\n");
        out.push_str(&format!(
            "<div><h4>{}</h4><ul>\n<li>hello@nomadicode.com</li>\n<li>+1 (856) 263-0593</li>\n\
             <li><a href=\"https://wa.me/18562630593\">{}</a></li>\n\
             <li><a href=\"https://calendly.com/richard-nomadicode/30min\">{}</a></li>\n\
             </ul></div>\n",
            self.t("footer.contact"),
            self.t("footer.whatsapp"),
            self.t("footer.consultation")
        ));
        out.push_str(&format!(
            "<p class=\"copyright\">&copy; {} Nomadicode. {}</p>\n</footer>\n",
            Utc::now().year(),
            self.t("footer.rights")
        ));
        out
    }

    fn toast(&self, notification: &Notification) -> String {
        let kind = match notification.kind {
            NotificationKind::Success => "success",
            NotificationKind::Error => "error",
        };
        let body = escape(notification.body.text(self.translations, self.lang));
        format!(
            "<div class=\"toast toast-{}\" role=\"alert\"><h3>{}</h3><p>{}</p></div>\n",
            kind,
            self.t(notification.title),
            body
        )
    }
}

fn story_card(story: &SuccessStory) -> String {
    format!(
        "<div class=\"card\">\n<img src=\"{}\" alt=\"{}\">\n<h3>{}</h3>\n<p>{}</p>\n{}\
         <div class=\"client\"><p>{}</p><p>{}</p></div>\n</div>\n",
        escape(&story.image_url),
        escape(&story.title),
        escape(&story.title),
        escape(&story.description),
        tags(&story.tags),
        escape(&story.client_name),
        escape(&story.industry)
    )
}

fn project_card(project: &InternalProject, visit: &str, code: &str) -> String {
    let mut links = String::new();
    if let Some(url) = non_empty(&project.project_url) {
        links.push_str(&external_link(url, "project-link", visit));
    }
    if let Some(url) = non_empty(&project.github_url) {
        links.push_str(&external_link(url, "github-link", code));
    }
    format!(
        "<div class=\"card\">\n<img src=\"{}\" alt=\"{}\">\n<h3>{}</h3>\n<p>{}</p>\n{}\
         <div class=\"links\">\n{}</div>\n</div>\n",
        escape(&project.image_url),
        escape(&project.title),
        escape(&project.title),
        escape(&project.description),
        tags(&project.tags),
        links
    )
}

/// A URL worth linking to: present and not blank.
fn non_empty(url: &Option<String>) -> Option<&str> {
    url.as_deref().filter(|url| !url.trim().is_empty())
}

fn external_link(url: &str, class: &str, label: &str) -> String {
    format!(
        "<a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\" class=\"{}\">{}</a>\n",
        escape(url),
        class,
        label
    )
}

fn review_card(review: &Review) -> String {
    let stars = usize::try_from(review.rating.clamp(0, MAX_STARS)).unwrap_or_default();
    format!(
        "<div class=\"card\">\n<img src=\"{}\" alt=\"{}\" class=\"avatar\">\n<h3>{}</h3>\n\
         <p class=\"company\">{}</p>\n<p>{}</p>\n<div class=\"stars\">{}</div>\n</div>\n",
        escape(&review.image_url),
        escape(&review.author),
        escape(&review.author),
        escape(&review.company),
        escape(&review.content),
        "<span class=\"star\">&#9733;</span>".repeat(stars)
    )
}

fn tags(tags: &[String]) -> String {
    let mut out = String::from("<div class=\"tags\">");
    for tag in tags {
        out.push_str(&format!("<span class=\"tag\">{}</span>", escape(tag)));
    }
    out.push_str("</div>\n");
    out
}

fn option(value: &str, label: &str, selected: bool) -> String {
    format!(
        "<option value=\"{}\"{}>{}</option>\n",
        escape(value),
        if selected { " selected" } else { "" },
        label
    )
}

fn analytics_snippet(id: &str) -> String {
    let id = escape(id);
    format!(
        "<script async src=\"https://www.googletagmanager.com/gtag/js?id={id}\"></script>\n\
         <script>\n\
         window.dataLayer = window.dataLayer || [];\n\
         function gtag(){{dataLayer.push(arguments);}}\n\
         gtag('js', new Date());\n\
         gtag('config', '{id}');\n\
         </script>\n"
    )
}

pub fn escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
