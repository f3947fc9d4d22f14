use crate::aggregator::ViewModel;

const STYLE: &str = "\
body { font-family: sans-serif; text-align: center; background: white; padding: 20px; }
.temp { font-size: 80px; font-weight: bold; }
.info { font-size: 24px; color: #555; margin-bottom: 40px; }
.tram { font-size: 50px; border: 3px solid black; margin: 10px; padding: 10px; }";

/// Full page for one view. The page reloads itself every `refresh_secs`.
pub fn render_page(view: &ViewModel, transit_label: &str, refresh_secs: u32) -> String {
    let arrivals: String = view
        .arrivals
        .iter()
        .map(|arrival| {
            let heading = match &arrival.line {
                Some(line) => format!("{} {}", transit_label, line),
                None => transit_label.to_string(),
            };
            format!(
                "    <div class=\"tram\">{}: {}</div>\n",
                escape(&heading),
                escape(&arrival.status.to_string())
            )
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta http-equiv="refresh" content="{refresh}">
    <style>
{style}
    </style>
</head>
<body>
    <div class="temp">{temp}°C</div>
    <div class="info">Feels like: {feels}°C | Wind: {wind} m/s</div>
    <hr>
{arrivals}    <hr>
    <div class="info">Electricity now</div>
    <div class="temp">{price} c/kWh</div>
    <div class="temp" style="margin-top: 20px;">{cheapest}</div>
</body>
</html>
"#,
        refresh = refresh_secs,
        style = STYLE,
        temp = view.temperature,
        feels = view.feels_like,
        wind = view.wind_speed,
        arrivals = arrivals,
        price = escape(&view.electricity_price),
        cheapest = escape(&view.cheapest_window),
    )
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
