/// Generate client methods with oneshot channel boilerplate, the request
/// deadline and automatic tracing.
///
/// The client needs `sender` and `deadline` fields; the error type needs
/// `ActorCommunicationError(String)` and `Timeout(Duration)` variants.
/// Parameters are never recorded on the span since they may carry secrets.
macro_rules! client_method {
    ($client:ty => fn $method:ident($($param:ident: $param_type:ty),*) -> $return_type:ty as $request:ident::$variant:ident, Error = $error_type:ty) => {
        impl $client {
            #[tracing::instrument(skip_all)]
            pub async fn $method(&self, $($param: $param_type),*) -> Result<$return_type, $error_type> {
                tracing::debug!("Sending request");
                let call = async {
                    let (respond_to, response) = tokio::sync::oneshot::channel();
                    let request = $request::$variant {
                        $($param,)*
                        respond_to,
                    };
                    if self.sender.send(request).await.is_err() {
                        return Err(<$error_type>::ActorCommunicationError("Actor closed".to_string()));
                    }
                    match response.await {
                        Ok(result) => result,
                        Err(_) => Err(<$error_type>::ActorCommunicationError("Actor dropped".to_string())),
                    }
                };

                match tokio::time::timeout(self.deadline, call).await {
                    Ok(result) => result,
                    Err(_) => {
                        tracing::error!(deadline_ms = self.deadline.as_millis() as u64, "Request deadline exceeded");
                        Err(<$error_type>::Timeout(self.deadline))
                    }
                }
            }
        }
    };
}
