/// Starter policy written by `warden init`: baseline security headers for every
/// path, API and static-asset cache rules, one legacy redirect and an image
/// allowlist.
pub const DEFAULT_POLICY_TOML: &str = r#"# Warden policy declaration
#
# Header rules are applied in order; when two matching rules set the same
# header, the later rule wins. Redirects use the first matching rule.

[[headers]]
source = "/(.*)"
headers = [
  { key = "X-Content-Type-Options", value = "nosniff" },
  { key = "X-Frame-Options", value = "DENY" },
  { key = "X-XSS-Protection", value = "1; mode=block" },
  { key = "Referrer-Policy", value = "strict-origin-when-cross-origin" },
  { key = "Strict-Transport-Security", value = "max-age=63072000; includeSubDomains; preload" },
  { key = "Permissions-Policy", value = "camera=(), microphone=(), geolocation=(), payment=()" },
  { key = "Content-Security-Policy", value = "default-src 'self'; script-src 'self' 'unsafe-eval' 'unsafe-inline' https://vercel.live https://js.sentry-cdn.com; style-src 'self' 'unsafe-inline' https://fonts.googleapis.com; font-src 'self' https://fonts.gstatic.com; img-src 'self' data: blob: https:; connect-src 'self' https: wss:; object-src 'none'; base-uri 'self';" },
]

[[headers]]
source = "/.well-known/farcaster.json"
headers = [
  { key = "Content-Type", value = "application/json" },
  { key = "Cache-Control", value = "public, max-age=3600" },
]

[[headers]]
source = "/api/(.*)"
headers = [
  { key = "Cache-Control", value = "no-store, no-cache, must-revalidate, proxy-revalidate" },
  { key = "X-Content-Type-Options", value = "nosniff" },
  { key = "X-Frame-Options", value = "DENY" },
]

[[headers]]
source = "/static/(.*)"
headers = [
  { key = "Cache-Control", value = "public, max-age=31536000, immutable" },
]

[[redirects]]
source = "/game"
destination = "/"
permanent = true

[images]
formats = ["image/webp", "image/avif"]
device_sizes = [640, 750, 828, 1080, 1200, 1920, 2048]
image_sizes = [16, 32, 48, 64, 96, 128, 256, 384]
domains = [
  "usdozf7pplhxfvrl.public.blob.vercel-storage.com",
  "api.dicebear.com",
  "avatars.githubusercontent.com",
  "storage.carromarena.com",
  "cdn.carromarena.com",
  "assets.carromarena.com",
]
dangerously_allow_svg = false
content_security_policy = "default-src 'self'; script-src 'none'; sandbox;"

[[images.remote_patterns]]
protocol = "https"
hostname = "**.vercel-storage.com"

[[images.remote_patterns]]
protocol = "https"
hostname = "api.dicebear.com"

[[images.remote_patterns]]
protocol = "https"
hostname = "**.carromarena.com"

[[images.remote_patterns]]
protocol = "https"
hostname = "res.cloudinary.com"

[platform]
strict_transport_security = true
response_limit = "8mb"
body_size_limit = "8mb"
compress = true
powered_by_header = false
generate_etags = true

[monitoring]
tunnel_route = "/monitoring"
hide_source_maps = true
silent = true
"#;
