// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OpenAPI 3.0 document and the HTML pages served at /docs and /test-login.

use serde_json::{json, Value};

/// Build the OpenAPI specification served at /openapi.json.
pub fn spec() -> Value {
    json!({
        "openapi": "3.0.0",
        "info": {
            "title": "Fold Backend API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Backend API for the Fold application: authentication, user management, and file uploads."
        },
        "servers": [
            { "url": "http://localhost:3000", "description": "Development server" }
        ],
        "tags": [
            { "name": "Health", "description": "Health check endpoints" },
            { "name": "Auth", "description": "Authentication endpoints" },
            { "name": "User", "description": "User management endpoints" },
            { "name": "Upload", "description": "File upload endpoints (Appwrite)" }
        ],
        "paths": {
            "/health": {
                "get": {
                    "tags": ["Health"],
                    "summary": "Health check",
                    "responses": {
                        "200": {
                            "description": "API is healthy",
                            "content": { "application/json": { "schema": {
                                "type": "object",
                                "properties": {
                                    "success": { "type": "boolean", "example": true },
                                    "status": { "type": "string", "example": "healthy" },
                                    "uptime": { "type": "number", "example": 123.456 },
                                    "timestamp": { "type": "string", "format": "date-time" }
                                }
                            } } }
                        }
                    }
                }
            },
            "/api/auth/sign-up/email": {
                "post": {
                    "tags": ["Auth"],
                    "summary": "Register with email",
                    "requestBody": { "required": true, "content": { "application/json": { "schema": {
                        "type": "object",
                        "required": ["email", "password", "name"],
                        "properties": {
                            "email": { "type": "string", "format": "email" },
                            "password": { "type": "string", "minLength": 8, "maxLength": 128 },
                            "name": { "type": "string", "minLength": 1, "maxLength": 100 }
                        }
                    } } } },
                    "responses": {
                        "200": { "description": "Account created; session cookie set", "content": { "application/json": { "schema": { "$ref": "#/components/schemas/AuthResponse" } } } },
                        "400": { "$ref": "#/components/responses/BadRequest" }
                    }
                }
            },
            "/api/auth/sign-in/email": {
                "post": {
                    "tags": ["Auth"],
                    "summary": "Sign in with email",
                    "requestBody": { "required": true, "content": { "application/json": { "schema": {
                        "type": "object",
                        "required": ["email", "password"],
                        "properties": {
                            "email": { "type": "string", "format": "email" },
                            "password": { "type": "string" }
                        }
                    } } } },
                    "responses": {
                        "200": { "description": "Signed in; session cookie set", "content": { "application/json": { "schema": { "$ref": "#/components/schemas/AuthResponse" } } } },
                        "401": { "$ref": "#/components/responses/Unauthorized" }
                    }
                }
            },
            "/api/auth/sign-in/social": {
                "post": {
                    "tags": ["Auth"],
                    "summary": "Start Google OAuth",
                    "requestBody": { "required": true, "content": { "application/json": { "schema": {
                        "type": "object",
                        "required": ["provider"],
                        "properties": {
                            "provider": { "type": "string", "example": "google" },
                            "callbackURL": { "type": "string", "format": "uri" }
                        }
                    } } } },
                    "responses": {
                        "200": { "description": "Authorization URL to redirect the browser to" }
                    }
                }
            },
            "/api/auth/callback/google": {
                "get": {
                    "tags": ["Auth"],
                    "summary": "Google OAuth callback",
                    "parameters": [
                        { "name": "code", "in": "query", "schema": { "type": "string" } },
                        { "name": "state", "in": "query", "required": true, "schema": { "type": "string" } }
                    ],
                    "responses": {
                        "307": { "description": "Redirect to the frontend with a session cookie set" }
                    }
                }
            },
            "/api/auth/sign-out": {
                "post": {
                    "tags": ["Auth"],
                    "summary": "Sign out",
                    "responses": { "200": { "description": "Session deleted and cookie cleared" } }
                }
            },
            "/api/auth/session": {
                "get": {
                    "tags": ["Auth"],
                    "summary": "Get session state",
                    "responses": { "200": { "description": "Current user and session, or nulls" } }
                }
            },
            "/api/auth/forgot-password": {
                "post": {
                    "tags": ["Auth"],
                    "summary": "Request a password reset token",
                    "requestBody": { "required": true, "content": { "application/json": { "schema": {
                        "type": "object",
                        "required": ["email"],
                        "properties": { "email": { "type": "string", "format": "email" } }
                    } } } },
                    "responses": { "200": { "description": "Uniform response regardless of account existence" } }
                }
            },
            "/api/auth/reset-password": {
                "post": {
                    "tags": ["Auth"],
                    "summary": "Reset password with a token",
                    "requestBody": { "required": true, "content": { "application/json": { "schema": {
                        "type": "object",
                        "required": ["token", "newPassword"],
                        "properties": {
                            "token": { "type": "string" },
                            "newPassword": { "type": "string", "minLength": 8, "maxLength": 128 }
                        }
                    } } } },
                    "responses": {
                        "200": { "description": "Password reset; all sessions revoked" },
                        "400": { "$ref": "#/components/responses/BadRequest" }
                    }
                }
            },
            "/api/user/me": {
                "get": {
                    "tags": ["User"],
                    "summary": "Get current user profile",
                    "security": [{ "cookieAuth": [] }, { "bearerAuth": [] }],
                    "responses": {
                        "200": { "description": "Profile", "content": { "application/json": { "schema": { "$ref": "#/components/schemas/UserResponse" } } } },
                        "401": { "$ref": "#/components/responses/Unauthorized" }
                    }
                },
                "patch": {
                    "tags": ["User"],
                    "summary": "Update profile (name, avatar)",
                    "security": [{ "cookieAuth": [] }, { "bearerAuth": [] }],
                    "requestBody": { "required": true, "content": { "application/json": { "schema": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string", "minLength": 1, "maxLength": 100 },
                            "avatar": { "type": "string", "format": "uri", "nullable": true }
                        }
                    } } } },
                    "responses": {
                        "200": { "description": "Updated profile" },
                        "400": { "$ref": "#/components/responses/BadRequest" },
                        "401": { "$ref": "#/components/responses/Unauthorized" }
                    }
                },
                "delete": {
                    "tags": ["User"],
                    "summary": "Delete account (cascades to sessions and accounts)",
                    "security": [{ "cookieAuth": [] }, { "bearerAuth": [] }],
                    "responses": {
                        "200": { "description": "Account deleted" },
                        "401": { "$ref": "#/components/responses/Unauthorized" }
                    }
                }
            },
            "/api/user/change-password": {
                "post": {
                    "tags": ["User"],
                    "summary": "Change password; revokes other sessions",
                    "security": [{ "cookieAuth": [] }, { "bearerAuth": [] }],
                    "requestBody": { "required": true, "content": { "application/json": { "schema": {
                        "type": "object",
                        "required": ["currentPassword", "newPassword"],
                        "properties": {
                            "currentPassword": { "type": "string" },
                            "newPassword": { "type": "string", "minLength": 8, "maxLength": 128 }
                        }
                    } } } },
                    "responses": {
                        "200": { "description": "Password changed" },
                        "400": { "$ref": "#/components/responses/BadRequest" },
                        "401": { "$ref": "#/components/responses/Unauthorized" }
                    }
                }
            },
            "/api/user/sessions": {
                "get": {
                    "tags": ["User"],
                    "summary": "List active sessions",
                    "security": [{ "cookieAuth": [] }, { "bearerAuth": [] }],
                    "responses": {
                        "200": { "description": "Sessions (tokens omitted, current flagged)" },
                        "401": { "$ref": "#/components/responses/Unauthorized" }
                    }
                }
            },
            "/api/user/revoke-sessions": {
                "post": {
                    "tags": ["User"],
                    "summary": "Revoke all other sessions",
                    "security": [{ "cookieAuth": [] }, { "bearerAuth": [] }],
                    "responses": {
                        "200": { "description": "Other sessions revoked" },
                        "401": { "$ref": "#/components/responses/Unauthorized" }
                    }
                }
            },
            "/api/upload": {
                "post": {
                    "tags": ["Upload"],
                    "summary": "Upload a single file",
                    "security": [{ "cookieAuth": [] }, { "bearerAuth": [] }],
                    "requestBody": { "required": true, "content": { "multipart/form-data": { "schema": {
                        "type": "object",
                        "properties": { "file": { "type": "string", "format": "binary" } }
                    } } } },
                    "responses": {
                        "200": { "description": "Uploaded file record", "content": { "application/json": { "schema": { "$ref": "#/components/schemas/FileResponse" } } } },
                        "400": { "$ref": "#/components/responses/BadRequest" },
                        "401": { "$ref": "#/components/responses/Unauthorized" }
                    }
                }
            },
            "/api/upload/multiple": {
                "post": {
                    "tags": ["Upload"],
                    "summary": "Upload up to 10 files",
                    "security": [{ "cookieAuth": [] }, { "bearerAuth": [] }],
                    "requestBody": { "required": true, "content": { "multipart/form-data": { "schema": {
                        "type": "object",
                        "properties": { "files": { "type": "array", "items": { "type": "string", "format": "binary" } } }
                    } } } },
                    "responses": {
                        "200": { "description": "Uploaded file records" },
                        "400": { "$ref": "#/components/responses/BadRequest" },
                        "401": { "$ref": "#/components/responses/Unauthorized" }
                    }
                }
            },
            "/api/upload/avatar": {
                "post": {
                    "tags": ["Upload"],
                    "summary": "Upload an avatar (image only, max 5MB)",
                    "security": [{ "cookieAuth": [] }, { "bearerAuth": [] }],
                    "requestBody": { "required": true, "content": { "multipart/form-data": { "schema": {
                        "type": "object",
                        "properties": { "avatar": { "type": "string", "format": "binary" } }
                    } } } },
                    "responses": {
                        "200": { "description": "Avatar record with thumbnail URLs" },
                        "400": { "$ref": "#/components/responses/BadRequest" },
                        "401": { "$ref": "#/components/responses/Unauthorized" }
                    }
                }
            },
            "/api/upload/{fileId}": {
                "get": {
                    "tags": ["Upload"],
                    "summary": "Get file details",
                    "security": [{ "cookieAuth": [] }, { "bearerAuth": [] }],
                    "parameters": [{ "name": "fileId", "in": "path", "required": true, "schema": { "type": "string" } }],
                    "responses": {
                        "200": { "description": "File record" },
                        "404": { "$ref": "#/components/responses/NotFound" },
                        "401": { "$ref": "#/components/responses/Unauthorized" }
                    }
                },
                "delete": {
                    "tags": ["Upload"],
                    "summary": "Delete a file",
                    "security": [{ "cookieAuth": [] }, { "bearerAuth": [] }],
                    "parameters": [{ "name": "fileId", "in": "path", "required": true, "schema": { "type": "string" } }],
                    "responses": {
                        "200": { "description": "File deleted" },
                        "404": { "$ref": "#/components/responses/NotFound" },
                        "401": { "$ref": "#/components/responses/Unauthorized" }
                    }
                }
            },
            "/api/upload/list/all": {
                "get": {
                    "tags": ["Upload"],
                    "summary": "List all files in the bucket",
                    "security": [{ "cookieAuth": [] }, { "bearerAuth": [] }],
                    "parameters": [
                        { "name": "limit", "in": "query", "schema": { "type": "integer", "default": 25 } },
                        { "name": "offset", "in": "query", "schema": { "type": "integer", "default": 0 } }
                    ],
                    "responses": {
                        "200": { "description": "File listing with pagination metadata" },
                        "401": { "$ref": "#/components/responses/Unauthorized" }
                    }
                }
            }
        },
        "components": {
            "securitySchemes": {
                "cookieAuth": { "type": "apiKey", "in": "cookie", "name": "fold.session_token" },
                "bearerAuth": { "type": "http", "scheme": "bearer" }
            },
            "schemas": {
                "User": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string" },
                        "name": { "type": "string" },
                        "email": { "type": "string", "format": "email" },
                        "avatar": { "type": "string", "nullable": true },
                        "emailVerified": { "type": "boolean" },
                        "createdAt": { "type": "string", "format": "date-time" },
                        "updatedAt": { "type": "string", "format": "date-time" }
                    }
                },
                "UserResponse": {
                    "type": "object",
                    "properties": {
                        "success": { "type": "boolean", "example": true },
                        "data": { "$ref": "#/components/schemas/User" }
                    }
                },
                "AuthResponse": {
                    "type": "object",
                    "properties": {
                        "success": { "type": "boolean", "example": true },
                        "data": {
                            "type": "object",
                            "properties": {
                                "user": { "$ref": "#/components/schemas/User" },
                                "token": { "type": "string" }
                            }
                        }
                    }
                },
                "File": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string" },
                        "name": { "type": "string" },
                        "mimeType": { "type": "string" },
                        "size": { "type": "integer" },
                        "url": { "type": "string" },
                        "previewUrl": { "type": "string" },
                        "downloadUrl": { "type": "string" },
                        "createdAt": { "type": "string" }
                    }
                },
                "FileResponse": {
                    "type": "object",
                    "properties": {
                        "success": { "type": "boolean", "example": true },
                        "data": { "$ref": "#/components/schemas/File" }
                    }
                },
                "Error": {
                    "type": "object",
                    "properties": {
                        "success": { "type": "boolean", "example": false },
                        "error": { "type": "string" },
                        "message": { "type": "string" }
                    }
                }
            },
            "responses": {
                "BadRequest": {
                    "description": "Validation or request error",
                    "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Error" } } }
                },
                "Unauthorized": {
                    "description": "Authentication required",
                    "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Error" } } }
                },
                "NotFound": {
                    "description": "Resource not found",
                    "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Error" } } }
                }
            }
        }
    })
}

/// Swagger UI page served at /docs.
pub const SWAGGER_UI_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>Fold Backend API - Docs</title>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css" />
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
  <script>
    window.onload = () => {
      SwaggerUIBundle({
        url: '/openapi.json',
        dom_id: '#swagger-ui',
      });
    };
  </script>
</body>
</html>
"#;

/// Manual auth test harness served at /test-login.
pub const TEST_LOGIN_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>Test Login</title>
  <style>
    body { font-family: system-ui; max-width: 400px; margin: 50px auto; padding: 20px; }
    button { width: 100%; padding: 15px; margin: 10px 0; font-size: 16px; cursor: pointer; border-radius: 8px; }
    .google { background: #4285F4; color: white; border: none; }
    .email { background: #6366F1; color: white; border: none; }
    input { width: 100%; padding: 12px; margin: 5px 0; box-sizing: border-box; border-radius: 4px; border: 1px solid #ccc; }
    #result { padding: 15px; margin-top: 20px; border-radius: 8px; background: #f0f0f0; white-space: pre-wrap; }
  </style>
</head>
<body>
  <h2>Auth Test Page</h2>

  <h3>Google OAuth</h3>
  <button class="google" onclick="googleSignIn()">Sign in with Google</button>

  <h3>Email/Password</h3>
  <input type="email" id="email" placeholder="Email" value="test@example.com" />
  <input type="password" id="password" placeholder="Password" value="password123" />
  <input type="text" id="name" placeholder="Name (for signup)" value="Test User" />
  <button class="email" onclick="signUp()">Sign Up</button>
  <button class="email" onclick="signIn()">Sign In</button>

  <h3>Session</h3>
  <button onclick="getSession()">Get Session</button>
  <button onclick="signOut()">Sign Out</button>

  <div id="result">Results will appear here...</div>

  <script>
    async function signUp() {
      const res = await fetch('/api/auth/sign-up/email', {
        method: 'POST',
        headers: { 'Content-Type': 'application/json' },
        body: JSON.stringify({
          email: document.getElementById('email').value,
          password: document.getElementById('password').value,
          name: document.getElementById('name').value,
        }),
        credentials: 'include',
      });
      document.getElementById('result').textContent = JSON.stringify(await res.json(), null, 2);
    }

    async function signIn() {
      const res = await fetch('/api/auth/sign-in/email', {
        method: 'POST',
        headers: { 'Content-Type': 'application/json' },
        body: JSON.stringify({
          email: document.getElementById('email').value,
          password: document.getElementById('password').value,
        }),
        credentials: 'include',
      });
      document.getElementById('result').textContent = JSON.stringify(await res.json(), null, 2);
    }

    async function getSession() {
      const res = await fetch('/api/auth/session', { credentials: 'include' });
      document.getElementById('result').textContent = JSON.stringify(await res.json(), null, 2);
    }

    async function signOut() {
      await fetch('/api/auth/sign-out', { method: 'POST', credentials: 'include' });
      document.getElementById('result').textContent = 'Signed out!';
    }

    async function googleSignIn() {
      document.getElementById('result').textContent = 'Redirecting to Google...';
      const res = await fetch('/api/auth/sign-in/social', {
        method: 'POST',
        headers: { 'Content-Type': 'application/json' },
        body: JSON.stringify({
          provider: 'google',
          callbackURL: window.location.origin + '/test-login',
        }),
        credentials: 'include',
      });
      const body = await res.json();
      if (body.data && body.data.url) {
        window.location.href = body.data.url;
      } else {
        document.getElementById('result').textContent = JSON.stringify(body, null, 2);
      }
    }
  </script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_covers_all_routes() {
        let spec = spec();
        let paths = spec["paths"].as_object().unwrap();

        for path in [
            "/health",
            "/api/auth/sign-up/email",
            "/api/auth/sign-in/email",
            "/api/user/me",
            "/api/user/change-password",
            "/api/user/sessions",
            "/api/upload",
            "/api/upload/multiple",
            "/api/upload/avatar",
            "/api/upload/{fileId}",
            "/api/upload/list/all",
        ] {
            assert!(paths.contains_key(path), "missing path: {}", path);
        }
    }

    #[test]
    fn test_spec_is_openapi_3() {
        assert_eq!(spec()["openapi"], "3.0.0");
    }
}
