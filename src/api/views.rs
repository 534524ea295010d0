//! Server-rendered pages.
//!
//! Pages are plain HTML strings. Every value that did not come from this module
//! (flash messages) goes through [`escape`].

use crate::api::session::{Flash, FLASH_ERRORS, FLASH_SUCCESS};
use std::fmt::Write;

pub fn home(flash: &Flash) -> String {
    layout(
        "Início",
        flash,
        r#"<h1>Bem-vindo</h1>
<p><a href="/login/index">Entrar</a> · <a href="/cadastro/index">Criar conta</a></p>"#,
    )
}

pub fn login(flash: &Flash) -> String {
    layout(
        "Login",
        flash,
        r#"<h1>Login</h1>
<p>Ainda não tem conta? <a href="/cadastro/index">Cadastre-se</a>.</p>"#,
    )
}

pub fn signup(flash: &Flash) -> String {
    layout(
        "Cadastro",
        flash,
        r#"<h1>Cadastro</h1>
<form method="post" action="/login/cadastro">
  <label for="email">E-mail</label>
  <input type="email" id="email" name="email" required>
  <label for="password">Senha</label>
  <input type="password" id="password" name="password" required minlength="3" maxlength="50">
  <button type="submit">Criar conta</button>
</form>"#,
    )
}

pub fn not_found() -> String {
    layout(
        "Página não encontrada",
        &Flash::default(),
        r#"<h1>404</h1>
<p>Página não encontrada.</p>
<p><a href="/">Voltar para o início</a></p>"#,
    )
}

fn layout(title: &str, flash: &Flash, body: &str) -> String {
    let mut page = String::with_capacity(1024);
    page.push_str("<!DOCTYPE html>\n<html lang=\"pt-BR\">\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(page, "<title>{}</title>", escape(title));
    page.push_str("<link rel=\"stylesheet\" href=\"/style.css\">\n</head>\n<body>\n<main>\n");
    page.push_str(&messages(flash));
    page.push_str(body);
    page.push_str("\n</main>\n</body>\n</html>\n");
    page
}

/// Flash messages block, empty when nothing is pending.
fn messages(flash: &Flash) -> String {
    let mut out = String::new();

    let errors = flash.get(FLASH_ERRORS);
    if !errors.is_empty() {
        out.push_str("<ul class=\"alert alert-danger\">\n");
        for error in errors {
            let _ = writeln!(out, "<li>{}</li>", escape(error));
        }
        out.push_str("</ul>\n");
    }

    for success in flash.get(FLASH_SUCCESS) {
        let _ = writeln!(
            out,
            "<p class=\"alert alert-success\">{}</p>",
            escape(success)
        );
    }

    out
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
