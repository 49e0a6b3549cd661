//! Leaflet page composition.
//!
//! [`compose`] builds the page the snapshot driver captures; [`compose_interactive`]
//! builds the routing-machine page served to browsers. Both are pure string
//! templating: the same inputs always give the same bytes.

use serde_json::value::RawValue;

use crate::{LatLng, RouteRequest, Viewport};

pub const DEFAULT_LEAFLET_BASE: &str = "https://unpkg.com/leaflet@1.9.4/dist";
pub const DEFAULT_ROUTING_MACHINE_BASE: &str = "https://unpkg.com/leaflet-routing-machine@3.2.12/dist";
pub const DEFAULT_TILE_URL: &str =
    "https://api.mapbox.com/styles/v1/mapbox/streets-v11/tiles/{z}/{x}/{y}?access_token={accessToken}";
pub const OSM_TILE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const OSM_ATTRIBUTION: &str =
    "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors";
pub const DEFAULT_OSRM_URL: &str = "https://router.project-osrm.org/route/v1";

/// DOM id of the map container
pub const MAP_ELEMENT_ID: &str = "map";

/// Global the snapshot page sets to `true` once tiles for the fitted view loaded
pub const READY_FLAG: &str = "__routeshotReady";

const BLUE_ICON_URL: &str =
    "https://raw.githubusercontent.com/pointhi/leaflet-color-markers/master/img/marker-icon-2x-blue.png";
const GREEN_ICON_URL: &str =
    "https://raw.githubusercontent.com/pointhi/leaflet-color-markers/master/img/marker-icon-2x-green.png";
const SHADOW_URL: &str = "https://cdnjs.cloudflare.com/ajax/libs/leaflet/0.7.7/images/marker-shadow.png";

/// Rendering options shared by both pages
#[derive(Debug, Clone)]
pub struct SceneOptions {
    /// Where `leaflet.css` and `leaflet.js` are loaded from
    pub leaflet_base: String,
    /// Where the routing machine assets are loaded from (interactive page)
    pub routing_machine_base: String,
    /// Tile URL template for the snapshot page
    pub tile_url: String,
    /// Value for Leaflet's `{accessToken}` placeholder in `tile_url`
    pub access_token: Option<String>,
    /// OSRM service used by the interactive page
    pub osrm_url: String,
    /// Size of the `#map` container
    pub map_size: Viewport,
    /// Padding passed to `fitBounds`, in pixels
    pub fit_padding: u32,
    /// Draw the origin/destination legend on the snapshot page
    pub legend: bool,
}

impl Default for SceneOptions {
    fn default() -> Self {
        Self {
            leaflet_base: DEFAULT_LEAFLET_BASE.to_string(),
            routing_machine_base: DEFAULT_ROUTING_MACHINE_BASE.to_string(),
            tile_url: DEFAULT_TILE_URL.to_string(),
            access_token: None,
            osrm_url: DEFAULT_OSRM_URL.to_string(),
            map_size: Viewport::default(),
            fit_padding: 50,
            legend: false,
        }
    }
}

const SNAPSHOT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <title>Map Snapshot</title>
  <meta charset="utf-8" />
  <link rel="stylesheet" href="{{LEAFLET_BASE}}/leaflet.css" />
  <script src="{{LEAFLET_BASE}}/leaflet.js"></script>
  <style> body { margin: 0; padding: 0; } #{{MAP_ID}} { width: {{WIDTH}}px; height: {{HEIGHT}}px; } {{LEGEND_CSS}}</style>
</head>
<body>
  <div id="{{MAP_ID}}"></div>
  <script>
    window.{{READY_FLAG}} = false;
    const map = L.map({{MAP_ID_JS}});
    const tiles = L.tileLayer({{TILE_URL}}, { accessToken: {{ACCESS_TOKEN}} }).addTo(map);

{{ICONS}}

    const originMarker = L.marker([{{ORIGIN}}], { icon: blueIcon }).addTo(map);
    const destinationMarker = L.marker([{{DESTINATION}}], { icon: greenIcon }).addTo(map);

    const routeGeoJson = {{GEOMETRY}};
    const routeLayer = L.geoJSON(routeGeoJson, { style: { color: 'blue', opacity: 0.8, weight: 6 } }).addTo(map);
{{LEGEND}}
    map.fitBounds(routeLayer.getBounds(), { padding: [{{PADDING}}, {{PADDING}}] });
    tiles.once('load', function () { window.{{READY_FLAG}} = true; });
  </script>
</body>
</html>
"#;

const INTERACTIVE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="pt-BR">
<head>
  <title>Rota</title>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <link rel="stylesheet" href="{{LEAFLET_BASE}}/leaflet.css" />
  <link rel="stylesheet" href="{{ROUTING_BASE}}/leaflet-routing-machine.css" />
  <script src="{{LEAFLET_BASE}}/leaflet.js"></script>
  <script src="{{ROUTING_BASE}}/leaflet-routing-machine.min.js"></script>
  <style> html, body { margin: 0; padding: 0; height: 100%; } #{{MAP_ID}} { width: 100%; height: 100%; } {{LEGEND_CSS}}</style>
</head>
<body>
  <div id="{{MAP_ID}}"></div>
  <script>
    const map = L.map({{MAP_ID_JS}});
    L.tileLayer({{TILE_URL}}, { attribution: {{ATTRIBUTION}} }).addTo(map);

{{ICONS}}

    const waypoints = [L.latLng({{ORIGIN}}), L.latLng({{DESTINATION}})];
    L.Routing.control({
      waypoints: waypoints,
      show: false,
      routeWhileDragging: false,
      createMarker: function (i, waypoint, n) {
        const icon = i === 0 ? blueIcon : (i === n - 1 ? greenIcon : undefined);
        return L.marker(waypoint.latLng, { icon: icon, draggable: false });
      },
      lineOptions: { styles: [{ color: 'blue', opacity: 0.6, weight: 6 }] },
      router: L.Routing.osrmv1({ serviceUrl: {{OSRM_URL}} })
    }).addTo(map);
{{LEGEND}}
  </script>
</body>
</html>
"#;

const ICONS_SNIPPET: &str = r#"    const blueIcon = new L.Icon({ iconUrl: {{BLUE_URL}}, shadowUrl: {{SHADOW_URL}}, iconSize: [25, 41], iconAnchor: [12, 41], popupAnchor: [1, -34], shadowSize: [41, 41] });
    const greenIcon = new L.Icon({ iconUrl: {{GREEN_URL}}, shadowUrl: {{SHADOW_URL}}, iconSize: [25, 41], iconAnchor: [12, 41], popupAnchor: [1, -34], shadowSize: [41, 41] });"#;

const LEGEND_SNIPPET: &str = r#"
    const legend = L.control({ position: 'topright' });
    legend.onAdd = function () {
      const div = L.DomUtil.create('div', 'info legend');
      div.innerHTML = '<h4>Legenda</h4>'
        + '<div><img src="' + blueIcon.options.iconUrl + '"> <span>Origem</span></div>'
        + '<div><img src="' + greenIcon.options.iconUrl + '"> <span>Destino</span></div>';
      return div;
    };
    legend.addTo(map);
"#;

const LEGEND_CSS: &str =
    ".legend { background: white; padding: 6px 8px; border-radius: 4px; } .legend img { height: 20px; vertical-align: middle; }";

/// Compose the snapshot page for `request` with `geometry` as the route overlay.
///
/// The geometry text is embedded exactly as given. Numeric coordinates are
/// written with Rust's shortest round-trip formatting, so `-23.4875` stays
/// `-23.4875`.
pub fn compose(request: &RouteRequest, geometry: &RawValue, options: &SceneOptions) -> String {
    let (legend, legend_css) = legend_parts(options.legend);

    SNAPSHOT_TEMPLATE
        .replace("{{ICONS}}", &icons())
        .replace("{{LEGEND}}", legend)
        .replace("{{LEGEND_CSS}}", legend_css)
        .replace("{{LEAFLET_BASE}}", &html_attr(&options.leaflet_base))
        .replace("{{MAP_ID_JS}}", &js_string(MAP_ELEMENT_ID))
        .replace("{{MAP_ID}}", MAP_ELEMENT_ID)
        .replace("{{WIDTH}}", &options.map_size.width.to_string())
        .replace("{{HEIGHT}}", &options.map_size.height.to_string())
        .replace("{{READY_FLAG}}", READY_FLAG)
        .replace("{{TILE_URL}}", &js_string(&options.tile_url))
        .replace("{{ACCESS_TOKEN}}", &js_string(options.access_token.as_deref().unwrap_or("")))
        .replace("{{PADDING}}", &options.fit_padding.to_string())
        .replace("{{ORIGIN}}", &lat_lng(request.origin))
        .replace("{{DESTINATION}}", &lat_lng(request.destination))
        // Last, so nothing inside the geometry is mistaken for a placeholder
        .replace("{{GEOMETRY}}", &script_safe(geometry.get()))
}

/// Compose the interactive page that routes client-side through OSRM
pub fn compose_interactive(request: &RouteRequest, options: &SceneOptions) -> String {
    let (legend, legend_css) = legend_parts(true);

    INTERACTIVE_TEMPLATE
        .replace("{{ICONS}}", &icons())
        .replace("{{LEGEND}}", legend)
        .replace("{{LEGEND_CSS}}", legend_css)
        .replace("{{LEAFLET_BASE}}", &html_attr(&options.leaflet_base))
        .replace("{{ROUTING_BASE}}", &html_attr(&options.routing_machine_base))
        .replace("{{MAP_ID_JS}}", &js_string(MAP_ELEMENT_ID))
        .replace("{{MAP_ID}}", MAP_ELEMENT_ID)
        .replace("{{TILE_URL}}", &js_string(OSM_TILE_URL))
        .replace("{{ATTRIBUTION}}", &js_string(OSM_ATTRIBUTION))
        .replace("{{OSRM_URL}}", &js_string(&options.osrm_url))
        .replace("{{ORIGIN}}", &lat_lng(request.origin))
        .replace("{{DESTINATION}}", &lat_lng(request.destination))
}

fn icons() -> String {
    ICONS_SNIPPET
        .replace("{{BLUE_URL}}", &js_string(BLUE_ICON_URL))
        .replace("{{GREEN_URL}}", &js_string(GREEN_ICON_URL))
        .replace("{{SHADOW_URL}}", &js_string(SHADOW_URL))
}

fn legend_parts(enabled: bool) -> (&'static str, &'static str) {
    if enabled {
        (LEGEND_SNIPPET, LEGEND_CSS)
    } else {
        ("", "")
    }
}

fn lat_lng(point: LatLng) -> String {
    format!("{}, {}", point.lat, point.lng)
}

/// A JavaScript string literal for `value`, safe inside an inline `<script>`
fn js_string(value: &str) -> String {
    // Serializing a &str cannot fail
    script_safe(&serde_json::Value::from(value).to_string())
}

/// Keep `</script>` sequences from terminating the inline script early
fn script_safe(json: &str) -> String {
    json.replace("</", "<\\/")
}

fn html_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
