use crate::actions::{
    NEW_TICKET_ENDPOINT, RELOAD_DELAY, TICKET_FORM_ID, TICKET_MODAL_ID, UPDATE_STATUS_ENDPOINT,
};
use crate::chart::{ANIMATION_MS, CANVAS_ID, CLOSED_CLASS, COLORS, LABELS, OPEN_CLASS, PROGRESS_CLASS};
use crate::search::{SEARCH_BOX_ID, SEARCH_CELL_CLASS, TABLE_ID};
use crate::theme::{Theme, STORAGE_KEY, TOGGLE_ID};

pub fn render_main_js() -> String {
    MAIN_JS
        .replace("{{STORAGE_KEY}}", STORAGE_KEY)
        .replace("{{TOGGLE_ID}}", TOGGLE_ID)
        .replace("{{DARK_GLYPH}}", Theme::Dark.glyph())
        .replace("{{LIGHT_GLYPH}}", Theme::Light.glyph())
        .replace("{{UPDATE_STATUS}}", UPDATE_STATUS_ENDPOINT)
        .replace("{{NEW_TICKET}}", NEW_TICKET_ENDPOINT)
        .replace("{{FORM_ID}}", TICKET_FORM_ID)
        .replace("{{MODAL_ID}}", TICKET_MODAL_ID)
        .replace("{{RELOAD_DELAY}}", &RELOAD_DELAY.as_millis().to_string())
        .replace("{{SEARCH_ID}}", SEARCH_BOX_ID)
        .replace("{{TABLE_ID}}", TABLE_ID)
        .replace("{{SEARCH_CELL}}", SEARCH_CELL_CLASS)
}

pub fn render_chart_js() -> String {
    let quoted = |items: [&str; 3]| {
        items
            .iter()
            .map(|item| format!("\"{item}\""))
            .collect::<Vec<_>>()
            .join(", ")
    };
    CHART_JS
        .replace("{{CANVAS_ID}}", CANVAS_ID)
        .replace("{{OPEN_CLASS}}", OPEN_CLASS)
        .replace("{{PROGRESS_CLASS}}", PROGRESS_CLASS)
        .replace("{{CLOSED_CLASS}}", CLOSED_CLASS)
        .replace("{{LABELS}}", &quoted(LABELS))
        .replace("{{COLORS}}", &quoted(COLORS))
        .replace("{{DURATION}}", &ANIMATION_MS.to_string())
}

pub const STYLE_CSS: &str = r#":root {
  --hd-bg: #f5f7fb;
  --hd-card: #ffffff;
  --hd-ink: #1f2933;
  --hd-muted: #6b7280;
  --hd-border: rgba(31, 41, 51, 0.12);
}

[data-theme="dark"] {
  --hd-bg: #111827;
  --hd-card: #1f2937;
  --hd-ink: #e5e7eb;
  --hd-muted: #9ca3af;
  --hd-border: rgba(229, 231, 235, 0.14);
}

body {
  background: var(--hd-bg);
  color: var(--hd-ink);
  transition: background 200ms ease, color 200ms ease;
}

.card,
.modal-content,
.table {
  background: var(--hd-card);
  color: var(--hd-ink);
  border-color: var(--hd-border);
}

.stat-card .display-6 {
  font-weight: 600;
}

#ticketChart {
  max-height: 260px;
}

#themeToggle {
  border: none;
  background: transparent;
  font-size: 1.3rem;
}

.text-muted-soft {
  color: var(--hd-muted);
}

#actionError:empty {
  display: none;
}
"#;

const MAIN_JS: &str = r##"$(function () {
  const root = document.documentElement;
  const glyph = (theme) => (theme === "dark" ? "{{DARK_GLYPH}}" : "{{LIGHT_GLYPH}}");
  const stored = localStorage.getItem("{{STORAGE_KEY}}");
  const theme = stored === "dark" || stored === "light" ? stored : "light";
  root.dataset.theme = theme;
  $("#{{TOGGLE_ID}}").text(glyph(theme));
  $("#{{TOGGLE_ID}}").click(() => {
    const next = root.dataset.theme === "light" ? "dark" : "light";
    root.dataset.theme = next;
    localStorage.setItem("{{STORAGE_KEY}}", next);
    $("#{{TOGGLE_ID}}").text(glyph(next));
  });

  const showError = (message) => {
    $("#actionError").text(message);
  };
  const reason = (xhr) => {
    if (xhr.responseJSON && xhr.responseJSON.error) {
      return xhr.responseJSON.error;
    }
    return xhr.status ? `${xhr.status} ${xhr.statusText}` : "network error";
  };

  $(".update-status").click(function () {
    const id = $(this).data("id");
    const select = $(`.status-select[data-id="${id}"]`);
    if (!select.length) {
      return;
    }
    $.post("{{UPDATE_STATUS}}", { id, status: select.val() })
      .done(() => location.reload())
      .fail((xhr) => showError(`Could not update ticket status: ${reason(xhr)}`));
  });

  $("#{{FORM_ID}}").submit(function (e) {
    e.preventDefault();
    $.post("{{NEW_TICKET}}", $(this).serialize())
      .done(() => {
        $("#{{MODAL_ID}}").modal("hide");
        setTimeout(() => location.reload(), {{RELOAD_DELAY}});
      })
      .fail((xhr) => showError(`Could not create ticket: ${reason(xhr)}`));
  });

  $("#{{SEARCH_ID}}").on("input", function () {
    const query = $(this).val().toLowerCase();
    $("#{{TABLE_ID}} tbody tr").each(function () {
      const text = $(this)
        .find("td.{{SEARCH_CELL}}")
        .map(function () {
          return $(this).text();
        })
        .get()
        .join(" ");
      $(this).toggle(text.toLowerCase().indexOf(query) > -1);
    });
  });

  if ("serviceWorker" in navigator) {
    navigator.serviceWorker.register("/sw.js");
  }
});
"##;

const CHART_JS: &str = r#"document.addEventListener("DOMContentLoaded", function () {
  const ctx = document.getElementById("{{CANVAS_ID}}");
  if (!ctx) return;

  const count = (cls) => parseInt($(`.${cls}`).first().text()) || 0;

  new Chart(ctx, {
    type: "doughnut",
    data: {
      labels: [{{LABELS}}],
      datasets: [{
        data: [count("{{OPEN_CLASS}}"), count("{{PROGRESS_CLASS}}"), count("{{CLOSED_CLASS}}")],
        backgroundColor: [{{COLORS}}],
        borderWidth: 1,
      }],
    },
    options: {
      plugins: { legend: { position: "bottom" } },
      animation: { animateRotate: true, duration: {{DURATION}} },
    },
  });
});
"#;
