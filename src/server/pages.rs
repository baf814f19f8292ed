use crate::{error::Result, models::RenderState, pipeline::RenderService};
use minijinja::{context, Environment};
use once_cell::sync::Lazy;

static PAGES: Lazy<Environment<'static>> = Lazy::new(|| {
    let mut env = Environment::new();
    for (name, source) in [
        ("layout.html", LAYOUT),
        ("landing.html", LANDING),
        ("dashboard.html", DASHBOARD),
    ] {
        if let Err(e) = env.add_template(name, source) {
            log::error!("Page template {} failed to compile: {}", name, e);
        }
    }
    env
});

pub fn landing() -> Result<String> {
    Ok(PAGES.get_template("landing.html")?.render(context! {})?)
}

pub fn dashboard(state: &RenderState, service: &RenderService) -> Result<String> {
    let (render, error) = match state {
        RenderState::Succeeded(uri) => (Some(uri.to_string()), None),
        RenderState::Failed(message) => (None, Some(message.as_str())),
        _ => (None, None),
    };
    Ok(PAGES.get_template("dashboard.html")?.render(context! {
        render,
        error,
        submitting => matches!(state, RenderState::Submitting),
        preset => service.template().name.as_str(),
        pre_validate => service.pre_validates(),
        max_mood_board => crate::validation::MAX_MOOD_BOARD_IMAGES,
    })?)
}

const LAYOUT: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{% block title %}Graphite AI - From Sketch to Reality{% endblock %}</title>
  <meta name="description" content="AI-powered architectural rendering. Turn your 2D sketches into 3D models with mood board integration and text-based refinement.">
  <style>
    body { font-family: system-ui, sans-serif; margin: 0; color: #1f2937; background: #f9fafb; }
    header { display: flex; justify-content: space-between; align-items: center; padding: 1rem 2rem; background: #fff; border-bottom: 1px solid #e5e7eb; }
    header a { color: inherit; text-decoration: none; font-weight: 600; }
    main { max-width: 72rem; margin: 0 auto; padding: 2rem; }
    .card { background: #fff; border: 1px solid #e5e7eb; border-radius: .75rem; padding: 1.5rem; }
    .grid { display: grid; grid-template-columns: minmax(16rem, 1fr) 3fr; gap: 2rem; }
    .button { display: inline-block; background: #111827; color: #fff; border: 0; border-radius: .5rem; padding: .75rem 1.25rem; font-weight: 600; cursor: pointer; text-decoration: none; }
    .button[disabled] { opacity: .5; cursor: progress; }
    .toast { border-left: 4px solid #dc2626; background: #fef2f2; padding: 1rem; border-radius: .5rem; margin-bottom: 1rem; }
    .render { width: 100%; border-radius: .5rem; background: #f3f4f6; }
    label { display: block; font-weight: 600; margin: 1rem 0 .5rem; }
    textarea { width: 100%; min-height: 5rem; }
  </style>
</head>
<body>
  <header><a href="/">Graphite3D</a><a class="button" href="/dashboard">Try it out</a></header>
  <main>{% block content %}{% endblock %}</main>
</body>
</html>
"#;

const LANDING: &str = r#"{% extends "layout.html" %}
{% block content %}
<section>
  <h1>From sketch to 3D render in seconds</h1>
  <p>Upload a hand-drawn sketch or an existing 2D plan and get a professional isometric 3D model back. Recognition, AI processing and rendering happen in one step.</p>
  <a class="button" href="/dashboard">Start rendering</a>
</section>
<section>
  <h2>Why architects struggle today</h2>
  <ul>
    <li><strong>Time-consuming</strong>: traditional 3D modelling takes 8-12 hours per project.</li>
    <li><strong>Expensive software</strong>: professional tools cost $200-500 per month with steep learning curves.</li>
    <li><strong>Complex workflow</strong>: multiple software switches from sketch to CAD to 3D rendering.</li>
  </ul>
</section>
<section>
  <h2>How it works</h2>
  <ol>
    <li><strong>Upload a floor plan.</strong> Hand-drawn sketches or existing 2D plans.</li>
    <li><strong>Instant 3D generation.</strong> The AI creates an isometric 3D model.</li>
    <li><strong>Professional output.</strong> Download the image for client presentations.</li>
  </ol>
</section>
{% endblock %}
"#;

const DASHBOARD: &str = r#"{% extends "layout.html" %}
{% block title %}Dashboard | Graphite3D{% endblock %}
{% block content %}
<div class="grid">
  <div class="card">
    <h2>Create Render</h2>
    <p>Upload a sketch to generate a 3D model.</p>
    <form id="render-form" method="post" action="/dashboard" enctype="multipart/form-data">
      <label for="sketch-upload">Architectural Sketch</label>
      <input id="sketch-upload" type="file" name="sketch" accept="image/png, image/jpeg, image/gif, image/webp" required>
      <details>
        <summary>Advanced Options</summary>
        <label for="text-prompt">Text Prompt</label>
        <textarea id="text-prompt" name="textPrompt" placeholder="e.g., 'Make it a modern style with lots of natural light.'"></textarea>
        <label for="mood-board-upload">Mood Board (up to {{ max_mood_board }})</label>
        <input id="mood-board-upload" type="file" name="moodBoard" accept="image/png, image/jpeg, image/gif, image/webp" multiple>
      </details>
      <p><button class="button" type="submit"{% if submitting %} disabled{% endif %}>{% if submitting %}Generating...{% else %}Generate Render{% endif %}</button></p>
    </form>
    <p><small>Style preset: {{ preset }}{% if pre_validate %} · sketches are checked before rendering{% endif %}</small></p>
  </div>
  <div class="card">
    <h2>Generated Render</h2>
    {% if error %}
    <div class="toast" role="alert"><strong>Generation Failed</strong><p>{{ error }}</p></div>
    {% endif %}
    {% if render %}
    <img class="render" src="{{ render }}" alt="Generated 3D Render">
    <p><a class="button" href="{{ render }}" download="graphite-render.png">Download</a></p>
    <form method="post" action="/dashboard/refine" enctype="multipart/form-data">
      <input type="hidden" name="renderDataUri" value="{{ render }}">
      <label for="refine-prompt">Refine this render</label>
      <textarea id="refine-prompt" name="textPrompt" placeholder="e.g., 'Add a skylight over the kitchen.'" required></textarea>
      <p><button class="button" type="submit">Refine</button></p>
    </form>
    {% else %}
    <p>The generated render will appear here.</p>
    {% endif %}
  </div>
</div>
<script>
  for (const form of document.querySelectorAll("form")) {
    form.addEventListener("submit", () => {
      const button = form.querySelector("button[type=submit]");
      button.disabled = true;
      button.textContent = "Generating...";
    });
  }
</script>
{% endblock %}
"#;
